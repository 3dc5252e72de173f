//! Logging capability injected into the monitor.
//!
//! The monitor emits named events with a handful of key/value fields, in the
//! style of a structured logger. Hosts pick the backend by handing the
//! monitor an `Arc<dyn HealthLog>`: [`NoopLog`] discards everything and
//! [`TracingLog`] forwards to `tracing`.
use std::fmt::Write as _;

/// Severity of a monitor event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A single structured field: static key, rendered value.
pub type Field<'a> = (&'static str, &'a dyn std::fmt::Display);

/// Sink for monitor events.
///
/// Implementations must be cheap and must not call back into the monitor:
/// events can be emitted while the monitor's state lock is held.
pub trait HealthLog: Send + Sync {
    fn log(&self, level: LogLevel, event: &str, fields: &[Field<'_>]);

    fn info(&self, event: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Info, event, fields);
    }

    fn warn(&self, event: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Warn, event, fields);
    }

    fn error(&self, event: &str, fields: &[Field<'_>]) {
        self.log(LogLevel::Error, event, fields);
    }
}

/// Discards every event. Used when the host does not supply a logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLog;

impl HealthLog for NoopLog {
    fn log(&self, _level: LogLevel, _event: &str, _fields: &[Field<'_>]) {}
}

/// Forwards events to the `tracing` macros.
///
/// The event name becomes the `event` field; the remaining fields are
/// rendered as `key=value` pairs in the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl HealthLog for TracingLog {
    fn log(&self, level: LogLevel, event: &str, fields: &[Field<'_>]) {
        let rendered = render_fields(fields);
        match level {
            LogLevel::Info => tracing::info!(target: "syncsentry", event, "{rendered}"),
            LogLevel::Warn => tracing::warn!(target: "syncsentry", event, "{rendered}"),
            LogLevel::Error => tracing::error!(target: "syncsentry", event, "{rendered}"),
        }
    }
}

/// Render fields as space-separated `key=value` pairs.
pub fn render_fields(fields: &[Field<'_>]) -> String {
    let mut out = String::new();
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{key}={value}");
    }
    out
}
