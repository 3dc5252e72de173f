//! Scan errors and the closed failure taxonomy.
//!
//! [`ScanError`] is what `count_files` returns to its caller. Every failure
//! the monitor records, whether or not it came from a `ScanError`, is tagged
//! with exactly one [`ErrorKind`].
use crate::model::SyncState;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Category of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The target (or its listing) is not readable by this process.
    PermissionDenied,
    /// The target path does not exist.
    PathNotFound,
    /// Counting failed for a reason outside the categories above.
    CountFailed,
    /// Counting ran longer than the configured `count_timeout`.
    CountTimeout,
    /// `start_scan` could not bring the scan up.
    ScanStartFailed,
    /// A check-loop tick panicked or the loop thread could not be spawned.
    MonitorLoopError,
    /// A recovery attempt did not restore a running scan.
    RecoveryFailed,
    /// Recovery was requested but the lifetime budget is spent.
    MaxRecoveryAttemptsReached,
}

impl ErrorKind {
    /// Stable wire name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::PathNotFound => "path_not_found",
            ErrorKind::CountFailed => "count_failed",
            ErrorKind::CountTimeout => "count_timeout",
            ErrorKind::ScanStartFailed => "scan_start_failed",
            ErrorKind::MonitorLoopError => "monitor_loop_error",
            ErrorKind::RecoveryFailed => "recovery_failed",
            ErrorKind::MaxRecoveryAttemptsReached => "max_recovery_attempts_reached",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while counting files under the target path.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("permission denied reading {}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("invalid file pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("counting {} exceeded {limit:?}", path.display())]
    TimedOut { path: PathBuf, limit: Duration },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Map an I/O error on `path` to the matching variant.
    pub fn from_io(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => ScanError::PathNotFound { path },
            io::ErrorKind::PermissionDenied => ScanError::PermissionDenied { path, source },
            _ => ScanError::Io { path, source },
        }
    }

    /// The taxonomy entry recorded for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            ScanError::PathNotFound { .. } => ErrorKind::PathNotFound,
            ScanError::TimedOut { .. } => ErrorKind::CountTimeout,
            ScanError::InvalidPattern { .. } | ScanError::Io { .. } => ErrorKind::CountFailed,
        }
    }

    /// The failure state the monitor enters when counting fails this way.
    pub fn state(&self) -> SyncState {
        match self {
            ScanError::PermissionDenied { .. } => SyncState::ErrorPermission,
            ScanError::PathNotFound { .. } => SyncState::ErrorNotFound,
            ScanError::TimedOut { .. } => SyncState::ErrorTimeout,
            ScanError::InvalidPattern { .. } | ScanError::Io { .. } => SyncState::ErrorUnknown,
        }
    }

    /// Only unexpected failures carry a trace in the error log.
    pub fn wants_trace(&self) -> bool {
        self.kind() == ErrorKind::CountFailed
    }

    /// Render the `source()` chain, one cause per line.
    ///
    /// Returns `None` when the error has no underlying cause.
    pub fn trace(&self) -> Option<String> {
        let mut cause = std::error::Error::source(self);
        let mut lines = Vec::new();
        while let Some(err) = cause {
            lines.push(format!("caused by: {err}"));
            cause = err.source();
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
