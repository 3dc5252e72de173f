//! Monitor lifecycle states.
use serde::Serialize;
use std::fmt;

/// The single active lifecycle state of a monitored scan.
///
/// `Completed` is the success terminal. The `Error*` states and `Stalled`
/// are failure states; they are only left through a recovery attempt, which
/// re-enters at `Initializing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Initializing,
    Counting,
    Scanning,
    Watching,
    Completed,
    ErrorPermission,
    ErrorNotFound,
    ErrorTimeout,
    ErrorUnknown,
    Stalled,
}

impl SyncState {
    /// Every state, in declaration order.
    pub const ALL: [SyncState; 10] = [
        SyncState::Initializing,
        SyncState::Counting,
        SyncState::Scanning,
        SyncState::Watching,
        SyncState::Completed,
        SyncState::ErrorPermission,
        SyncState::ErrorNotFound,
        SyncState::ErrorTimeout,
        SyncState::ErrorUnknown,
        SyncState::Stalled,
    ];

    /// Lower-case name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Initializing => "initializing",
            SyncState::Counting => "counting",
            SyncState::Scanning => "scanning",
            SyncState::Watching => "watching",
            SyncState::Completed => "completed",
            SyncState::ErrorPermission => "error_permission",
            SyncState::ErrorNotFound => "error_not_found",
            SyncState::ErrorTimeout => "error_timeout",
            SyncState::ErrorUnknown => "error_unknown",
            SyncState::Stalled => "stalled",
        }
    }

    /// True for `Stalled` and every `Error*` state.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            SyncState::ErrorPermission
                | SyncState::ErrorNotFound
                | SyncState::ErrorTimeout
                | SyncState::ErrorUnknown
                | SyncState::Stalled
        )
    }

    /// Whether stall detection applies in this state.
    pub fn can_stall(self) -> bool {
        self == SyncState::Scanning
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
