//! Scan metrics: raw counters plus values derived on read.
//!
//! All timing is taken from the monotonic `Instant` clock, so `runtime` and
//! `staleness` are `Duration`s and can never go negative even if the wall
//! clock is adjusted mid-scan. Floating point only appears in the derived
//! rates and percentages.
use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Counters and timestamps for one scan run.
///
/// A fresh value is allocated at construction and on every recovery attempt.
#[derive(Debug, Clone)]
pub struct SyncMetrics {
    /// Number of matching files, set once by counting.
    pub files_total: u64,
    /// Files processed so far. Never decreases.
    pub files_scanned: u64,
    /// Bytes reported by the scanning worker.
    pub bytes_processed: u64,
    /// Failures recorded over the lifetime of the monitor. Carried over
    /// when recovery replaces the metrics with a fresh run.
    pub errors_count: u64,
    /// Throughput as of the last progress update.
    files_per_second: f64,
    /// Progress updates received, including ones that did not advance.
    updates: u64,
    started: Instant,
    started_at: DateTime<Local>,
    last_progress: Instant,
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            files_total: 0,
            files_scanned: 0,
            bytes_processed: 0,
            errors_count: 0,
            files_per_second: 0.0,
            updates: 0,
            started: now,
            started_at: Local::now(),
            last_progress: now,
        }
    }

    /// Wall-clock time the run started.
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn runtime(&self) -> Duration {
        self.runtime_at(Instant::now())
    }

    pub fn runtime_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Time since `files_scanned` last increased (or since the run started).
    pub fn staleness(&self) -> Duration {
        self.staleness_at(Instant::now())
    }

    pub fn staleness_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_progress)
    }

    /// `files_scanned / files_total * 100`, or 0 when nothing was counted.
    pub fn progress_percent(&self) -> f64 {
        if self.files_total == 0 {
            return 0.0;
        }
        self.files_scanned as f64 / self.files_total as f64 * 100.0
    }

    pub fn files_per_second(&self) -> f64 {
        self.files_per_second
    }

    /// Number of progress updates received so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Apply a progress report.
    ///
    /// Returns `false` and leaves the counters untouched if `files_scanned`
    /// is lower than the current value. Of the progress calls, only a count
    /// that actually moves forward resets the staleness clock; the monitor
    /// also restarts it on entering `Scanning`
    /// (see [`restart_staleness_clock`](Self::restart_staleness_clock)).
    pub fn update_progress(&mut self, files_scanned: u64) -> bool {
        self.update_progress_at(files_scanned, Instant::now())
    }

    pub fn update_progress_at(&mut self, files_scanned: u64, now: Instant) -> bool {
        if files_scanned < self.files_scanned {
            return false;
        }
        self.updates += 1;
        if files_scanned > self.files_scanned {
            self.files_scanned = files_scanned;
            self.last_progress = now;
        }
        let runtime = self.runtime_at(now).as_secs_f64();
        if runtime > 0.0 {
            self.files_per_second = self.files_scanned as f64 / runtime;
        }
        true
    }

    /// Start the staleness window over without recording progress.
    ///
    /// Called when a scan enters `Scanning`, so time spent counting is not
    /// held against the scan. This is the one reset that does not come from
    /// `files_scanned` increasing.
    pub fn restart_staleness_clock(&mut self) {
        self.last_progress = Instant::now();
    }

    /// Rounded, serializable view of the metrics at `now`.
    pub fn snapshot_at(&self, now: Instant) -> MetricsSnapshot {
        self.snapshot_with(now, round2)
    }

    /// Same view without rounding, for threshold checks.
    pub fn unrounded_snapshot_at(&self, now: Instant) -> MetricsSnapshot {
        self.snapshot_with(now, |value| value)
    }

    fn snapshot_with(&self, now: Instant, round: fn(f64) -> f64) -> MetricsSnapshot {
        MetricsSnapshot {
            files_total: self.files_total,
            files_scanned: self.files_scanned,
            bytes_processed: self.bytes_processed,
            progress_percent: round(self.progress_percent()),
            files_per_second: round(self.files_per_second),
            runtime_seconds: round(self.runtime_at(now).as_secs_f64()),
            time_since_progress: round(self.staleness_at(now).as_secs_f64()),
            errors_count: self.errors_count,
            started_at: self.started_at,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot_at(Instant::now())
    }
}

/// Point-in-time copy of [`SyncMetrics`], rounded to two decimal places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub files_total: u64,
    pub files_scanned: u64,
    pub bytes_processed: u64,
    pub progress_percent: f64,
    pub files_per_second: f64,
    pub runtime_seconds: f64,
    pub time_since_progress: f64,
    pub errors_count: u64,
    pub started_at: DateTime<Local>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
