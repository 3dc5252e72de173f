//! Monitor configuration.
use std::path::PathBuf;
use std::time::Duration;

/// Seconds without forward progress before a scan is considered stalled.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between health checks in the background loop.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Lifetime budget of automatic recovery attempts.
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Files counted when no pattern is given.
pub const DEFAULT_PATTERN: &str = "*.md";

/// Lower bound for `check_interval`.
///
/// A zero interval would turn the check loop into a busy spin.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Target and timing configuration for a [`SyncHealthMonitor`].
///
/// [`SyncHealthMonitor`]: crate::monitor::SyncHealthMonitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory whose matching files are counted and scanned.
    pub target_path: PathBuf,
    /// Glob matched against file names (or relative paths if it contains `/`).
    pub pattern: String,
    /// Staleness beyond which a `Scanning` monitor is marked stalled.
    pub stall_timeout: Duration,
    /// Tick period of the background check loop.
    pub check_interval: Duration,
    /// Lifetime cap on recovery attempts. Never replenished.
    pub max_recovery_attempts: u32,
    /// Abort counting with `ErrorTimeout` once the walk runs this long.
    pub count_timeout: Option<Duration>,
}

impl MonitorConfig {
    /// Configuration for `target_path` with every other field at its default.
    pub fn new(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
            pattern: DEFAULT_PATTERN.to_owned(),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
            count_timeout: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_max_recovery_attempts(mut self, attempts: u32) -> Self {
        self.max_recovery_attempts = attempts;
        self
    }

    pub fn with_count_timeout(mut self, timeout: Duration) -> Self {
        self.count_timeout = Some(timeout);
        self
    }

    /// The tick period actually used by the check loop.
    pub fn effective_check_interval(&self) -> Duration {
        self.check_interval.max(MIN_CHECK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::new("/srv/notes");
        assert_eq!(config.target_path, PathBuf::from("/srv/notes"));
        assert_eq!(config.pattern, "*.md");
        assert_eq!(config.stall_timeout, Duration::from_secs(60));
        assert_eq!(config.check_interval, Duration::from_secs(10));
        assert_eq!(config.max_recovery_attempts, 3);
        assert!(config.count_timeout.is_none());
    }

    #[test]
    fn builder_overrides_apply() {
        let config = MonitorConfig::new("/srv/notes")
            .with_pattern("*.txt")
            .with_stall_timeout(Duration::from_secs(2))
            .with_check_interval(Duration::from_secs(1))
            .with_max_recovery_attempts(5)
            .with_count_timeout(Duration::from_secs(30));
        assert_eq!(config.pattern, "*.txt");
        assert_eq!(config.stall_timeout, Duration::from_secs(2));
        assert_eq!(config.check_interval, Duration::from_secs(1));
        assert_eq!(config.max_recovery_attempts, 5);
        assert_eq!(config.count_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_check_interval_is_clamped() {
        let config = MonitorConfig::new("/tmp").with_check_interval(Duration::ZERO);
        assert_eq!(config.effective_check_interval(), MIN_CHECK_INTERVAL);
    }
}
