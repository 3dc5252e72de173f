//! Reference scanning worker.
//!
//! Walks the monitor's target, then stats the matching files in chunks on the
//! rayon pool, reporting cumulative progress and bytes to the monitor after
//! every chunk. It follows the collaborator contract the monitor expects:
//! counts only ever increase, and liveness is published through a
//! [`WorkerLiveness`] the monitor can hold as a non-owning watcher.
//!
//! # Cancellation
//!
//! [`ScanWorker::cancel`] sets a flag that is checked between chunks. A
//! cancelled or panicked worker reports itself dead; a worker that finished
//! normally stays alive.
use crate::monitor::{SyncHealthMonitor, Watcher};
use crate::scanner::collect_matching;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Files stat-ed in parallel between two progress reports.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub chunk_size: usize,
    /// Pause after each chunk. Lets demos and tests observe a scan in flight.
    pub chunk_delay: Option<Duration>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: None,
        }
    }
}

/// How a worker run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Finished { files: u64, bytes: u64 },
    Cancelled { files: u64 },
    Failed(String),
}

/// Liveness flag shared between a worker thread and whoever watches it.
#[derive(Debug)]
pub struct WorkerLiveness {
    alive: AtomicBool,
}

impl WorkerLiveness {
    fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
        }
    }

    fn mark_dead(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }
}

impl Watcher for WorkerLiveness {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }
}

/// Handle to a running worker thread.
pub struct ScanWorker {
    cancel_flag: Arc<AtomicBool>,
    liveness: Arc<WorkerLiveness>,
    thread: Option<thread::JoinHandle<WorkerOutcome>>,
}

impl ScanWorker {
    /// Spawn a worker that scans the monitor's target and reports into it.
    pub fn spawn(monitor: Arc<SyncHealthMonitor>, options: WorkerOptions) -> io::Result<Self> {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let liveness = Arc::new(WorkerLiveness::new());
        let cancel_clone = Arc::clone(&cancel_flag);
        let liveness_clone = Arc::clone(&liveness);

        let thread = thread::Builder::new()
            .name("syncsentry-worker".into())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    run_worker(&monitor, &options, &cancel_clone)
                }));
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(_) => WorkerOutcome::Failed("worker panicked".to_owned()),
                };
                if !matches!(outcome, WorkerOutcome::Finished { .. }) {
                    liveness_clone.mark_dead();
                }
                outcome
            })?;

        Ok(Self {
            cancel_flag,
            liveness,
            thread: Some(thread),
        })
    }

    /// Request the worker to stop after its current chunk.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Liveness handle to register with [`SyncHealthMonitor::register_watcher`].
    pub fn liveness(&self) -> &Arc<WorkerLiveness> {
        &self.liveness
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the worker thread to exit.
    pub fn join(mut self) -> WorkerOutcome {
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| WorkerOutcome::Failed("worker panicked".to_owned())),
            None => WorkerOutcome::Failed("worker already joined".to_owned()),
        }
    }
}

fn run_worker(
    monitor: &SyncHealthMonitor,
    options: &WorkerOptions,
    cancel_flag: &AtomicBool,
) -> WorkerOutcome {
    let config = monitor.config();
    info!("Worker starting on {}", config.target_path.display());

    let files = match collect_matching(&config.target_path, &config.pattern) {
        Ok(files) => files,
        Err(err) => {
            warn!("Worker could not list {}: {}", config.target_path.display(), err);
            return WorkerOutcome::Failed(err.to_string());
        }
    };

    let chunk_size = options.chunk_size.max(1);
    let mut scanned: u64 = 0;
    let mut total_bytes: u64 = 0;

    for chunk in files.chunks(chunk_size) {
        if cancel_flag.load(Ordering::Relaxed) {
            debug!("Worker cancelled after {} files", scanned);
            return WorkerOutcome::Cancelled { files: scanned };
        }

        // Files that vanish between listing and stat still count as scanned.
        let bytes: u64 = chunk
            .par_iter()
            .map(|path| fs::symlink_metadata(path).map(|m| m.len()).unwrap_or(0))
            .sum();

        scanned += chunk.len() as u64;
        total_bytes += bytes;
        monitor.record_bytes(bytes);
        monitor.update_scan_progress(scanned);

        if let Some(delay) = options.chunk_delay {
            thread::sleep(delay);
        }
    }

    info!("Worker finished: {} files, {} bytes", scanned, total_bytes);
    WorkerOutcome::Finished {
        files: scanned,
        bytes: total_bytes,
    }
}
