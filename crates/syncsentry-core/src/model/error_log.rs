//! Bounded, append-only log of categorized failures.
use crate::error::ErrorKind;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum number of records retained. Older records are evicted first.
pub const ERROR_LOG_CAPACITY: usize = 100;

/// Number of records exposed in a health report.
pub const REPORT_ERROR_WINDOW: usize = 10;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, trace: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Local::now(),
            trace,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorLog {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(ERROR_LOG_CAPACITY)
    }
}

impl ErrorLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(ERROR_LOG_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, record: ErrorRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The `n` most recent records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ErrorRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn last(&self) -> Option<&ErrorRecord> {
        self.records.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> ErrorRecord {
        ErrorRecord::new(ErrorKind::CountFailed, format!("failure {i}"), None)
    }

    #[test]
    fn recent_returns_newest_window_in_order() {
        let mut log = ErrorLog::default();
        for i in 0..15 {
            log.push(record(i));
        }
        let recent = log.recent(REPORT_ERROR_WINDOW);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].message, "failure 5");
        assert_eq!(recent[9].message, "failure 14");
    }

    #[test]
    fn recent_with_fewer_records_returns_all() {
        let mut log = ErrorLog::default();
        log.push(record(0));
        log.push(record(1));
        assert_eq!(log.recent(10).len(), 2);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut log = ErrorLog::with_capacity(3);
        for i in 0..5 {
            log.push(record(i));
        }
        assert_eq!(log.len(), 3);
        let messages: Vec<_> = log.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["failure 2", "failure 3", "failure 4"]);
        assert_eq!(log.last().unwrap().message, "failure 4");
    }

    #[test]
    fn record_serializes_kind_as_type() {
        let json = serde_json::to_value(ErrorRecord::new(
            ErrorKind::PathNotFound,
            "path not found: /x",
            None,
        ))
        .unwrap();
        assert_eq!(json["type"], "path_not_found");
        assert_eq!(json["message"], "path not found: /x");
        assert!(json.get("trace").is_none());
    }
}
