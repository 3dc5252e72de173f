//! SyncSentry Core: stall detection and bounded recovery for file scans.
//!
//! This crate contains all monitoring logic with zero CLI dependencies.
//! It can be embedded in any host that runs a long file scan and wants a
//! pull-based health snapshot of it.
//!
//! # Modules
//!
//! - [`model`]: Lifecycle states, scan metrics, and the bounded error log.
//! - [`scanner`]: Parallel file counting and a reference scan worker.
//! - [`monitor`]: The health monitor, its check loop, recovery, and reports.
//! - [`config`]: Monitor timing and target configuration.
//! - [`log`]: Injectable logging capability used by the monitor.
//! - [`error`]: Scan errors and the closed failure taxonomy.
pub mod config;
pub mod error;
pub mod log;
pub mod model;
pub mod monitor;
pub mod scanner;

pub use config::MonitorConfig;
pub use error::{ErrorKind, ScanError};
pub use log::{HealthLog, LogLevel, NoopLog, TracingLog};
pub use model::{ErrorRecord, MetricsSnapshot, SyncMetrics, SyncState};
pub use monitor::report::{HealthReport, Recommendation};
pub use monitor::{SyncHealthMonitor, Watcher};
