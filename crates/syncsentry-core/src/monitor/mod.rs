//! Sync health monitor: tracks a scan's progress, detects silent stalls,
//! restarts the scan a bounded number of times, and renders health reports.
//!
//! # Usage
//!
//! ```ignore
//! let monitor = SyncHealthMonitor::new(MonitorConfig::new("/srv/notes"));
//! if monitor.start_scan() {
//!     monitor.start_monitoring();
//!     // ... worker calls monitor.update_scan_progress(n) as it goes ...
//! }
//! println!("{}", monitor.format_health_report());
//! monitor.stop_monitoring();
//! ```
//!
//! # Concurrency
//!
//! The check loop runs on its own thread, so state, metrics, the error log
//! and the recovery budget all sit behind one `parking_lot::Mutex`. The lock
//! is never held across a file walk or a call into the watcher.
pub mod check_loop;
pub mod recovery;
pub mod report;
pub mod watcher;

pub use check_loop::CheckOutcome;
pub use recovery::{RecoveryBudget, RecoveryOutcome};
pub use report::{HealthReport, Recommendation};
pub use watcher::{Watcher, WatcherStatus};

use crate::config::MonitorConfig;
use crate::error::{ErrorKind, ScanError};
use crate::log::{HealthLog, NoopLog};
use crate::model::{ErrorLog, ErrorRecord, SyncMetrics, SyncState, REPORT_ERROR_WINDOW};
use crate::scanner;
use check_loop::CheckLoop;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use watcher::WatcherSlot;

/// A progress log line is emitted every this many updates.
pub const PROGRESS_LOG_EVERY: u64 = 100;

/// Mutable monitor state, guarded by [`Shared::inner`].
struct Inner {
    state: SyncState,
    metrics: SyncMetrics,
    errors: ErrorLog,
    recovery: RecoveryBudget,
}

/// Everything the caller and the check loop share.
struct Shared {
    config: MonitorConfig,
    log: Arc<dyn HealthLog>,
    inner: Mutex<Inner>,
    watcher: WatcherSlot,
    running: AtomicBool,
}

/// Supervises one long-running scan.
///
/// All methods take `&self`; wrap the monitor in an `Arc` to share it with a
/// scanning worker. Dropping the monitor stops its check loop.
pub struct SyncHealthMonitor {
    shared: Arc<Shared>,
    check_loop: Mutex<Option<CheckLoop>>,
}

impl SyncHealthMonitor {
    /// Monitor with events discarded.
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_log(config, Arc::new(NoopLog))
    }

    pub fn with_log(config: MonitorConfig, log: Arc<dyn HealthLog>) -> Self {
        log.info(
            "sync_monitor_initialized",
            &[
                ("project_path", &config.target_path.display()),
                ("stall_timeout", &format!("{:?}", config.stall_timeout)),
            ],
        );
        let recovery = RecoveryBudget::new(config.max_recovery_attempts);
        Self {
            shared: Arc::new(Shared {
                config,
                log,
                inner: Mutex::new(Inner {
                    state: SyncState::Initializing,
                    metrics: SyncMetrics::new(),
                    errors: ErrorLog::default(),
                    recovery,
                }),
                watcher: WatcherSlot::default(),
                running: AtomicBool::new(false),
            }),
            check_loop: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Count matching files under the target, entering `Counting`.
    ///
    /// On failure the state moves to the matching failure state, one error
    /// record is appended, and the error is returned to the caller.
    pub fn count_files(&self) -> Result<u64, ScanError> {
        self.shared.count_files()
    }

    /// Count files and enter `Scanning`, or `Completed` if there are none.
    ///
    /// Returns `false` if counting failed; never panics or returns an error.
    pub fn start_scan(&self) -> bool {
        self.shared.start_scan()
    }

    /// Report that `files_scanned` files have been processed.
    pub fn update_scan_progress(&self, files_scanned: u64) {
        self.shared.update_scan_progress(files_scanned);
    }

    /// Add to the processed byte count.
    pub fn record_bytes(&self, bytes: u64) {
        let mut inner = self.shared.inner.lock();
        inner.metrics.bytes_processed = inner.metrics.bytes_processed.saturating_add(bytes);
    }

    /// Move a completed scan into live watching.
    ///
    /// Returns `false`, leaving the state alone, unless the scan is `Completed`.
    pub fn begin_watching(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.state != SyncState::Completed {
            return false;
        }
        inner.state = SyncState::Watching;
        self.shared.log.info("watching_started", &[]);
        true
    }

    /// Register the liveness handle of the process driving the scan.
    ///
    /// Only a weak reference is kept; once the caller drops its `Arc` the
    /// watcher reads as dead.
    pub fn register_watcher<W: Watcher + 'static>(&self, watcher: &Arc<W>) {
        let strong: Arc<dyn Watcher> = watcher.clone();
        self.shared.watcher.set(Arc::downgrade(&strong));
        self.shared.log.info("watcher_registered", &[]);
    }

    pub fn clear_watcher(&self) {
        self.shared.watcher.clear();
    }

    /// Start the background check loop. A second call while running only
    /// logs a warning.
    pub fn start_monitoring(&self) {
        let mut slot = self.check_loop.lock();
        if slot.is_some() {
            self.shared.log.warn("monitoring_already_running", &[]);
            return;
        }

        self.shared.running.store(true, Ordering::Release);
        match CheckLoop::spawn(Arc::clone(&self.shared)) {
            Ok(check_loop) => {
                *slot = Some(check_loop);
                let interval = self.shared.config.effective_check_interval();
                self.shared.log.info(
                    "monitoring_started",
                    &[("check_interval", &format!("{interval:?}"))],
                );
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.log.error("monitor_error", &[("error", &err)]);
                self.shared.add_error(
                    ErrorKind::MonitorLoopError,
                    format!("failed to spawn check loop: {err}"),
                    None,
                );
            }
        }
    }

    /// Stop the check loop and wait for it to exit.
    ///
    /// Safe to call repeatedly or without a prior `start_monitoring`.
    pub fn stop_monitoring(&self) {
        self.shared.running.store(false, Ordering::Release);
        // Release the slot before joining so a concurrent start does not block
        // on a tick in progress.
        let check_loop = self.check_loop.lock().take();
        if let Some(check_loop) = check_loop {
            check_loop.stop();
        }
        self.shared.log.info("monitoring_stopped", &[]);
    }

    pub fn is_monitoring(&self) -> bool {
        self.check_loop.lock().is_some()
    }

    /// Run one health check immediately, as the loop does on every tick.
    pub fn check_health(&self) -> CheckOutcome {
        self.shared.check_health()
    }

    pub fn state(&self) -> SyncState {
        self.shared.inner.lock().state
    }

    /// Copy of the current metrics.
    pub fn metrics(&self) -> SyncMetrics {
        self.shared.inner.lock().metrics.clone()
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.shared.inner.lock().recovery.attempts()
    }

    /// Every retained error record, oldest first.
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.shared.inner.lock().errors.iter().cloned().collect()
    }

    pub fn get_health_report(&self) -> HealthReport {
        self.shared.health_report()
    }

    pub fn format_health_report(&self) -> String {
        self.get_health_report().to_string()
    }
}

impl Drop for SyncHealthMonitor {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(check_loop) = self.check_loop.get_mut().take() {
            check_loop.stop();
        }
    }
}

impl Shared {
    fn count_files(&self) -> Result<u64, ScanError> {
        self.inner.lock().state = SyncState::Counting;
        let path = self.config.target_path.display();
        self.log.info("counting_files", &[("path", &path)]);

        // The walk runs unlocked; progress and reports stay responsive.
        let result = scanner::count_matching(
            &self.config.target_path,
            &self.config.pattern,
            self.config.count_timeout,
        );

        match result {
            Ok(count) => {
                self.log
                    .info("file_count_complete", &[("count", &count), ("path", &path)]);
                Ok(count)
            }
            Err(err) => {
                let mut inner = self.inner.lock();
                inner.state = err.state();
                let trace = if err.wants_trace() { err.trace() } else { None };
                self.record_error_locked(&mut inner, err.kind(), err.to_string(), trace);
                Err(err)
            }
        }
    }

    fn start_scan(&self) -> bool {
        self.log.info("scan_starting", &[]);

        let total = match self.count_files() {
            Ok(total) => total,
            Err(err) => {
                self.log.error(
                    ErrorKind::ScanStartFailed.as_str(),
                    &[("error", &err), ("error_type", &err.kind())],
                );
                return false;
            }
        };

        let mut inner = self.inner.lock();
        inner.metrics.files_total = total;
        if total == 0 {
            self.log.warn("no_files_found", &[]);
            inner.state = SyncState::Completed;
            return true;
        }

        inner.metrics.restart_staleness_clock();
        inner.state = SyncState::Scanning;
        self.log.info(
            "scan_started",
            &[("total_files", &total), ("state", &inner.state)],
        );
        true
    }

    fn update_scan_progress(&self, files_scanned: u64) {
        let mut inner = self.inner.lock();
        let current = inner.metrics.files_scanned;
        if !inner.metrics.update_progress(files_scanned) {
            self.log.warn(
                "scan_progress_regressed",
                &[("reported", &files_scanned), ("current", &current)],
            );
            return;
        }

        let total = inner.metrics.files_total;
        if files_scanned == total {
            if matches!(
                inner.state,
                SyncState::Initializing | SyncState::Counting | SyncState::Scanning
            ) {
                inner.state = SyncState::Completed;
                let duration = format!("{:.2}", inner.metrics.runtime().as_secs_f64());
                self.log.info(
                    "scan_completed",
                    &[("files", &files_scanned), ("duration", &duration)],
                );
            }
        } else if inner.metrics.updates().is_multiple_of(PROGRESS_LOG_EVERY) {
            let percent = format!("{:.1}", inner.metrics.progress_percent());
            self.log.info(
                "scan_progress",
                &[
                    ("scanned", &files_scanned),
                    ("total", &total),
                    ("percent", &percent),
                ],
            );
        }
    }

    fn add_error(&self, kind: ErrorKind, message: String, trace: Option<String>) {
        let mut inner = self.inner.lock();
        self.record_error_locked(&mut inner, kind, message, trace);
    }

    fn record_error_locked(
        &self,
        inner: &mut Inner,
        kind: ErrorKind,
        message: String,
        trace: Option<String>,
    ) {
        self.log.error(
            "error_logged",
            &[("error_type", &kind), ("message", &message)],
        );
        inner.errors.push(ErrorRecord::new(kind, message, trace));
        inner.metrics.errors_count += 1;
    }

    fn health_report(&self) -> HealthReport {
        let watcher = self.watcher.status();
        let inner = self.inner.lock();
        let now = Instant::now();
        let metrics = inner.metrics.snapshot_at(now);
        // Rules compare raw values; only the reported figures are rounded.
        let recommendations = report::recommendations(
            inner.state,
            &inner.metrics.unrounded_snapshot_at(now),
            &watcher,
            inner.recovery.attempts(),
            inner.recovery.max_attempts(),
        );
        HealthReport {
            healthy: !inner.state.is_failure(),
            state: inner.state,
            target_path: self.config.target_path.display().to_string(),
            pattern: self.config.pattern.clone(),
            metrics,
            watcher,
            errors: inner.errors.recent(REPORT_ERROR_WINDOW),
            recovery_attempts: inner.recovery.attempts(),
            max_recovery_attempts: inner.recovery.max_attempts(),
            recommendations,
        }
    }
}
