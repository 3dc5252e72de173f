//! End-to-end tests for the reference scan worker driving a live monitor.
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use syncsentry_core::scanner::worker::{ScanWorker, WorkerOptions, WorkerOutcome};
use syncsentry_core::{MonitorConfig, SyncHealthMonitor, SyncState, Watcher};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// `count` markdown files of `size` bytes each, spread over two folders,
/// plus a non-matching file. Returns the total matching byte count.
fn build_tree(root: &Path, count: usize, size: usize) -> u64 {
    let a = root.join("a");
    let b = root.join("b/deep");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();
    let body = "x".repeat(size);
    for i in 0..count {
        let dir = if i % 2 == 0 { &a } else { &b };
        fs::write(dir.join(format!("file_{i}.md")), &body).unwrap();
    }
    fs::write(root.join("ignored.txt"), "not markdown").unwrap();
    (count * size) as u64
}

fn started_monitor(root: &Path) -> Arc<SyncHealthMonitor> {
    let monitor = Arc::new(SyncHealthMonitor::new(MonitorConfig::new(root)));
    assert!(monitor.start_scan());
    monitor
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn worker_scans_to_completion() {
    let tmp = TempDir::new().unwrap();
    let expected_bytes = build_tree(tmp.path(), 80, 100);
    let monitor = started_monitor(tmp.path());
    assert_eq!(monitor.metrics().files_total, 80);

    let worker = ScanWorker::spawn(Arc::clone(&monitor), WorkerOptions::default()).unwrap();
    let liveness = Arc::clone(worker.liveness());
    monitor.register_watcher(&liveness);

    let outcome = worker.join();
    assert_eq!(
        outcome,
        WorkerOutcome::Finished {
            files: 80,
            bytes: expected_bytes
        }
    );
    assert!(liveness.is_alive());

    assert_eq!(monitor.state(), SyncState::Completed);
    let report = monitor.get_health_report();
    assert!(report.healthy);
    assert_eq!(report.metrics.files_scanned, 80);
    assert_eq!(report.metrics.bytes_processed, expected_bytes);
    assert_eq!(report.metrics.progress_percent, 100.0);
    assert_eq!(report.watcher.alive, Some(true));
    assert!(!monitor.check_health().watcher_dead);
}

#[test]
fn small_chunks_report_monotonic_progress() {
    let tmp = TempDir::new().unwrap();
    build_tree(tmp.path(), 25, 10);
    let monitor = started_monitor(tmp.path());

    let options = WorkerOptions {
        chunk_size: 4,
        chunk_delay: None,
    };
    let worker = ScanWorker::spawn(Arc::clone(&monitor), options).unwrap();
    assert!(matches!(worker.join(), WorkerOutcome::Finished { files: 25, .. }));

    let metrics = monitor.metrics();
    // 25 files in chunks of 4 is 7 progress reports, none of them regressions.
    assert_eq!(metrics.updates(), 7);
    assert_eq!(metrics.files_scanned, 25);
    assert_eq!(monitor.state(), SyncState::Completed);
}

#[test]
fn cancelled_worker_reports_dead() {
    let tmp = TempDir::new().unwrap();
    build_tree(tmp.path(), 200, 1);
    let monitor = started_monitor(tmp.path());

    let options = WorkerOptions {
        chunk_size: 10,
        chunk_delay: Some(Duration::from_millis(20)),
    };
    let worker = ScanWorker::spawn(Arc::clone(&monitor), options).unwrap();
    let liveness = Arc::clone(worker.liveness());
    monitor.register_watcher(&liveness);
    worker.cancel();
    assert!(worker.is_cancelled());

    match worker.join() {
        WorkerOutcome::Cancelled { files } => {
            assert!(files < 200);
            assert!(!liveness.is_alive());
            assert_eq!(monitor.state(), SyncState::Scanning);
            assert!(monitor.check_health().watcher_dead);
            assert_eq!(monitor.recovery_attempts(), 1);
        }
        // The worker may finish a tiny tree before seeing the flag.
        WorkerOutcome::Finished { files, .. } => assert_eq!(files, 200),
        WorkerOutcome::Failed(message) => panic!("unexpected failure: {message}"),
    }
}

#[test]
fn worker_on_vanished_target_fails_and_is_dead() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("vault");
    fs::create_dir_all(&target).unwrap();
    build_tree(&target, 5, 1);
    let monitor = started_monitor(&target);
    fs::remove_dir_all(&target).unwrap();

    let worker = ScanWorker::spawn(Arc::clone(&monitor), WorkerOptions::default()).unwrap();
    let liveness = Arc::clone(worker.liveness());
    monitor.register_watcher(&liveness);

    assert!(matches!(worker.join(), WorkerOutcome::Failed(_)));
    assert!(!liveness.is_alive());

    let outcome = monitor.check_health();
    assert!(outcome.watcher_dead);
    // The recovery re-counts the missing target and fails.
    assert_eq!(monitor.state(), SyncState::ErrorNotFound);
    assert!(!monitor.get_health_report().healthy);
}

#[test]
fn dropping_worker_handle_reads_dead_to_monitor() {
    let tmp = TempDir::new().unwrap();
    build_tree(tmp.path(), 3, 1);
    let monitor = started_monitor(tmp.path());

    let worker = ScanWorker::spawn(Arc::clone(&monitor), WorkerOptions::default()).unwrap();
    monitor.register_watcher(worker.liveness());
    let _ = worker.join();

    // Only the worker held the liveness handle.
    assert_eq!(monitor.get_health_report().watcher.alive, Some(false));
}
