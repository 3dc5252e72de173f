//! SyncSentry: health monitor for long-running file scans.
//!
//! Thin binary entry point. All logic lives in the `syncsentry-core` crate;
//! this wires a monitor to the reference scan worker and prints the final
//! health report.
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use syncsentry_core::scanner::worker::{ScanWorker, WorkerOptions, WorkerOutcome};
use syncsentry_core::{MonitorConfig, SyncHealthMonitor, TracingLog};

#[derive(Debug, Parser)]
#[command(name = "syncsentry", version, about)]
struct Cli {
    /// Directory to scan.
    path: PathBuf,

    /// Glob matched against file names (or relative paths if it contains '/').
    #[arg(long, default_value = syncsentry_core::config::DEFAULT_PATTERN)]
    pattern: String,

    /// Seconds without progress before the scan counts as stalled.
    #[arg(long, default_value_t = 60)]
    stall_timeout: u64,

    /// Seconds between health checks.
    #[arg(long, default_value_t = 10)]
    check_interval: u64,

    /// Lifetime cap on automatic recovery attempts.
    #[arg(long, default_value_t = 3)]
    max_recovery_attempts: u32,

    /// Give up counting after this many seconds.
    #[arg(long)]
    count_timeout: Option<u64>,

    /// Milliseconds to pause between worker chunks.
    #[arg(long)]
    chunk_delay_ms: Option<u64>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn monitor_config(&self) -> MonitorConfig {
        let config = MonitorConfig::new(&self.path)
            .with_pattern(&self.pattern)
            .with_stall_timeout(Duration::from_secs(self.stall_timeout))
            .with_check_interval(Duration::from_secs(self.check_interval))
            .with_max_recovery_attempts(self.max_recovery_attempts);
        match self.count_timeout {
            Some(secs) => config.with_count_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("SyncSentry starting on {}", cli.path.display());

    let monitor = Arc::new(SyncHealthMonitor::with_log(
        cli.monitor_config(),
        Arc::new(TracingLog),
    ));

    if monitor.start_scan() {
        monitor.start_monitoring();

        let options = WorkerOptions {
            chunk_delay: cli.chunk_delay_ms.map(Duration::from_millis),
            ..WorkerOptions::default()
        };
        let worker = ScanWorker::spawn(Arc::clone(&monitor), options)
            .context("failed to spawn scan worker")?;
        // Held past `join` so the final report reflects how the worker ended.
        let liveness = Arc::clone(worker.liveness());
        monitor.register_watcher(&liveness);

        match worker.join() {
            WorkerOutcome::Finished { files, bytes } => {
                tracing::info!("Worker processed {files} files ({bytes} bytes)");
            }
            WorkerOutcome::Cancelled { files } => {
                tracing::warn!("Worker cancelled after {files} files");
            }
            WorkerOutcome::Failed(message) => {
                tracing::error!("Worker failed: {message}");
            }
        }

        monitor.stop_monitoring();
    }

    let report = monitor.get_health_report();
    if cli.json {
        println!("{}", report.to_json().context("failed to serialise report")?);
    } else {
        print!("{report}");
    }

    Ok(if report.healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
