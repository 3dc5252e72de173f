//! Data model for a monitored scan.
//!
//! Re-exports the lifecycle state, the metrics tracker, and the error log.
pub mod error_log;
pub mod metrics;
pub mod state;

pub use error_log::{ErrorLog, ErrorRecord, ERROR_LOG_CAPACITY, REPORT_ERROR_WINDOW};
pub use metrics::{MetricsSnapshot, SyncMetrics};
pub use state::SyncState;
