//! Health report: a point-in-time snapshot of state, metrics, recent errors
//! and recommendations, renderable as JSON or as readable text.
use super::watcher::WatcherStatus;
use crate::model::{ErrorRecord, MetricsSnapshot, SyncState};
use serde::{Serialize, Serializer};
use std::fmt;

/// Throughput below which a running scan is flagged as slow.
pub const SLOW_SCAN_FILES_PER_SEC: f64 = 1.0;

/// Seconds without progress after which a running scan is flagged as quiet.
///
/// Independent of `stall_timeout`: this is a hint, not a state change.
pub const LONG_SILENCE_SECS: f64 = 30.0;

/// One actionable hint in a health report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    CheckPermissions,
    VerifyPath,
    CountTimedOut,
    StallRecoveryAttempted,
    WatcherDead,
    SlowScan,
    NoRecentProgress,
    RecoveryExhausted,
    AllHealthy,
}

impl Recommendation {
    pub fn message(self) -> &'static str {
        match self {
            Recommendation::CheckPermissions => "Permission error - check folder permissions",
            Recommendation::VerifyPath => "Path not found - verify the target path exists",
            Recommendation::CountTimedOut => {
                "File count timed out - target may be on a slow or unreachable volume"
            }
            Recommendation::StallRecoveryAttempted => {
                "Sync appears stalled - automatic recovery attempted"
            }
            Recommendation::WatcherDead => "Watcher is dead - restart required",
            Recommendation::SlowScan => "Slow scan detected - check disk I/O or file count",
            Recommendation::NoRecentProgress => "No progress for 30+ seconds - possible hang",
            Recommendation::RecoveryExhausted => {
                "Recovery attempts exhausted - manual intervention required"
            }
            Recommendation::AllHealthy => "All systems healthy",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Structured health snapshot returned by `get_health_report`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// False iff `state` is `Stalled` or any `Error*` state.
    pub healthy: bool,
    pub state: SyncState,
    pub target_path: String,
    pub pattern: String,
    pub metrics: MetricsSnapshot,
    pub watcher: WatcherStatus,
    /// The most recent errors, oldest first.
    pub errors: Vec<ErrorRecord>,
    pub recovery_attempts: u32,
    pub max_recovery_attempts: u32,
    pub recommendations: Vec<Recommendation>,
}

impl HealthReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Run every recommendation rule independently, in report order.
pub fn recommendations(
    state: SyncState,
    metrics: &MetricsSnapshot,
    watcher: &WatcherStatus,
    recovery_attempts: u32,
    max_recovery_attempts: u32,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if state == SyncState::ErrorPermission {
        recs.push(Recommendation::CheckPermissions);
    }
    if state == SyncState::ErrorNotFound {
        recs.push(Recommendation::VerifyPath);
    }
    if state == SyncState::ErrorTimeout {
        recs.push(Recommendation::CountTimedOut);
    }
    if state == SyncState::Stalled {
        recs.push(Recommendation::StallRecoveryAttempted);
    }
    if watcher.is_dead() {
        recs.push(Recommendation::WatcherDead);
    }
    if metrics.files_per_second < SLOW_SCAN_FILES_PER_SEC && metrics.files_scanned > 0 {
        recs.push(Recommendation::SlowScan);
    }
    if metrics.time_since_progress > LONG_SILENCE_SECS && state == SyncState::Scanning {
        recs.push(Recommendation::NoRecentProgress);
    }
    if state.is_failure() && recovery_attempts >= max_recovery_attempts {
        recs.push(Recommendation::RecoveryExhausted);
    }

    if recs.is_empty() {
        recs.push(Recommendation::AllHealthy);
    }
    recs
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;

        writeln!(f, "# Sync Health Report")?;
        writeln!(f)?;
        writeln!(
            f,
            "**Status:** {}",
            if self.healthy { "HEALTHY" } else { "UNHEALTHY" }
        )?;
        writeln!(f, "**State:** {}", self.state.as_str().to_uppercase())?;
        writeln!(f, "**Target:** {} ({})", self.target_path, self.pattern)?;
        writeln!(f)?;

        writeln!(f, "## Metrics")?;
        writeln!(
            f,
            "- **Progress:** {} / {} ({:.1}%)",
            m.files_scanned, m.files_total, m.progress_percent
        )?;
        writeln!(f, "- **Speed:** {:.2} files/sec", m.files_per_second)?;
        writeln!(f, "- **Processed:** {}", format_bytes(m.bytes_processed))?;
        writeln!(f, "- **Runtime:** {:.1} seconds", m.runtime_seconds)?;
        writeln!(f, "- **Last Progress:** {:.1} seconds ago", m.time_since_progress)?;
        writeln!(f, "- **Errors:** {}", m.errors_count)?;
        writeln!(f)?;

        writeln!(f, "## Watcher")?;
        let watcher = match self.watcher.alive {
            Some(true) => "ALIVE",
            Some(false) => "DEAD",
            None => "NOT STARTED",
        };
        writeln!(f, "- **Status:** {watcher}")?;
        writeln!(f)?;

        writeln!(f, "## Recent Errors")?;
        if self.errors.is_empty() {
            writeln!(f, "- None")?;
        }
        for err in &self.errors {
            writeln!(
                f,
                "- [{}] {}: {}",
                err.timestamp.format("%Y-%m-%d %H:%M:%S"),
                err.kind,
                err.message
            )?;
        }
        writeln!(f)?;

        writeln!(f, "## Recommendations")?;
        for rec in &self.recommendations {
            writeln!(f, "- {rec}")?;
        }

        if self.recovery_attempts > 0 {
            writeln!(f)?;
            writeln!(
                f,
                "**Recovery Attempts:** {} / {}",
                self.recovery_attempts, self.max_recovery_attempts
            )?;
        }
        Ok(())
    }
}

/// Human-readable byte count using binary units.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Local;

    fn metrics(scanned: u64, fps: f64, silence: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            files_total: 100,
            files_scanned: scanned,
            bytes_processed: 0,
            progress_percent: scanned as f64,
            files_per_second: fps,
            runtime_seconds: 10.0,
            time_since_progress: silence,
            errors_count: 0,
            started_at: Local::now(),
        }
    }

    const NO_WATCHER: WatcherStatus = WatcherStatus {
        exists: false,
        alive: None,
    };

    const DEAD_WATCHER: WatcherStatus = WatcherStatus {
        exists: true,
        alive: Some(false),
    };

    #[test]
    fn healthy_scan_gets_single_all_clear() {
        let recs = recommendations(SyncState::Scanning, &metrics(50, 5.0, 1.0), &NO_WATCHER, 0, 3);
        assert_eq!(recs, vec![Recommendation::AllHealthy]);
    }

    #[test]
    fn state_hints_map_one_to_one() {
        let m = metrics(0, 0.0, 0.0);
        let cases = [
            (SyncState::ErrorPermission, Recommendation::CheckPermissions),
            (SyncState::ErrorNotFound, Recommendation::VerifyPath),
            (SyncState::ErrorTimeout, Recommendation::CountTimedOut),
            (SyncState::Stalled, Recommendation::StallRecoveryAttempted),
        ];
        for (state, expected) in cases {
            assert_eq!(recommendations(state, &m, &NO_WATCHER, 0, 3), vec![expected]);
        }
    }

    #[test]
    fn rules_are_independent_and_ordered() {
        let recs = recommendations(SyncState::Stalled, &metrics(5, 0.5, 45.0), &DEAD_WATCHER, 3, 3);
        assert_eq!(
            recs,
            vec![
                Recommendation::StallRecoveryAttempted,
                Recommendation::WatcherDead,
                Recommendation::SlowScan,
                Recommendation::RecoveryExhausted,
            ]
        );
    }

    #[test]
    fn long_silence_only_while_scanning() {
        let m = metrics(50, 5.0, 31.0);
        assert_eq!(
            recommendations(SyncState::Scanning, &m, &NO_WATCHER, 0, 3),
            vec![Recommendation::NoRecentProgress]
        );
        assert_eq!(
            recommendations(SyncState::Completed, &m, &NO_WATCHER, 0, 3),
            vec![Recommendation::AllHealthy]
        );
    }

    #[test]
    fn thresholds_compare_unrounded_values() {
        let m = metrics(5, 0.996, 30.004);
        let recs = recommendations(SyncState::Scanning, &m, &NO_WATCHER, 0, 3);
        assert_eq!(
            recs,
            vec![Recommendation::SlowScan, Recommendation::NoRecentProgress]
        );
    }

    #[test]
    fn slow_scan_needs_some_progress() {
        let recs = recommendations(SyncState::Scanning, &metrics(0, 0.0, 1.0), &NO_WATCHER, 0, 3);
        assert_eq!(recs, vec![Recommendation::AllHealthy]);
    }

    #[test]
    fn text_report_lists_errors_and_recovery() {
        let report = HealthReport {
            healthy: false,
            state: SyncState::ErrorNotFound,
            target_path: "/srv/missing".to_owned(),
            pattern: "*.md".to_owned(),
            metrics: metrics(0, 0.0, 0.0),
            watcher: NO_WATCHER,
            errors: vec![ErrorRecord::new(
                ErrorKind::PathNotFound,
                "path not found: /srv/missing",
                None,
            )],
            recovery_attempts: 1,
            max_recovery_attempts: 3,
            recommendations: vec![Recommendation::VerifyPath],
        };
        let text = report.to_string();
        assert!(text.contains("**Status:** UNHEALTHY"));
        assert!(text.contains("**State:** ERROR_NOT_FOUND"));
        assert!(text.contains("path_not_found: path not found: /srv/missing"));
        assert!(text.contains("- **Status:** NOT STARTED"));
        assert!(text.contains("- Path not found - verify the target path exists"));
        assert!(text.contains("**Recovery Attempts:** 1 / 3"));
    }

    #[test]
    fn json_report_uses_plain_names() {
        let report = HealthReport {
            healthy: true,
            state: SyncState::Completed,
            target_path: "/srv/notes".to_owned(),
            pattern: "*.md".to_owned(),
            metrics: metrics(100, 20.0, 0.0),
            watcher: NO_WATCHER,
            errors: Vec::new(),
            recovery_attempts: 0,
            max_recovery_attempts: 3,
            recommendations: vec![Recommendation::AllHealthy],
        };
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["state"], "completed");
        assert_eq!(value["healthy"], true);
        assert_eq!(value["watcher"]["alive"], serde_json::Value::Null);
        assert_eq!(value["recommendations"][0], "All systems healthy");
    }

    #[test]
    fn bytes_format_with_binary_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1.0 MB");
    }
}
