//! Background check loop and the per-tick health check.
//!
//! The loop runs on its own named thread and waits on a stop channel with
//! `recv_timeout(check_interval)`, so a stop request interrupts the wait
//! immediately instead of sleeping out the rest of the interval.
use super::recovery::RecoveryOutcome;
use super::Shared;
use crate::error::ErrorKind;
use crate::model::SyncState;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What a single health check did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckOutcome {
    /// The scan was found stalled and moved to `Stalled`.
    pub stalled: bool,
    /// The registered watcher reported dead.
    pub watcher_dead: bool,
    /// Recovery results, in the order they were requested.
    pub recoveries: Vec<RecoveryOutcome>,
}

/// Handle to the running loop thread.
pub(super) struct CheckLoop {
    stop_tx: Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl CheckLoop {
    pub(super) fn spawn(shared: Arc<Shared>) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = shared.config.effective_check_interval();
        let thread = thread::Builder::new()
            .name("syncsentry-monitor".into())
            .spawn(move || run_loop(&shared, &stop_rx, interval))?;
        Ok(Self { stop_tx, thread })
    }

    /// Signal the loop and wait for it to exit. Never panics.
    pub(super) fn stop(self) {
        let _ = self.stop_tx.try_send(());
        // A watcher or logger stopping the monitor from inside a tick would
        // otherwise join its own thread.
        if self.thread.thread().id() == thread::current().id() {
            return;
        }
        let _ = self.thread.join();
    }
}

fn run_loop(shared: &Shared, stop_rx: &Receiver<()>, interval: Duration) {
    while shared.running.load(Ordering::Acquire) {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| shared.check_health())) {
            let message = panic_message(panic.as_ref());
            shared.log.error("monitor_error", &[("error", &message)]);
            shared.add_error(ErrorKind::MonitorLoopError, message, None);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("check panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("check panicked: {s}")
    } else {
        "check panicked".to_owned()
    }
}

impl Shared {
    /// One tick: stall rule first, then the watcher rule, each able to
    /// request a recovery on its own.
    pub(super) fn check_health(&self) -> CheckOutcome {
        let mut outcome = CheckOutcome::default();

        {
            let mut inner = self.inner.lock();
            let staleness = inner.metrics.staleness();
            if inner.state.can_stall() && staleness > self.config.stall_timeout {
                let secs = format!("{:.2}", staleness.as_secs_f64());
                let files_scanned = inner.metrics.files_scanned;
                self.log.warn(
                    "sync_stalled",
                    &[("time_since_progress", &secs), ("files_scanned", &files_scanned)],
                );
                inner.state = SyncState::Stalled;
                outcome.stalled = true;
            }
        }
        if outcome.stalled {
            outcome.recoveries.push(self.attempt_recovery());
        }

        if self.watcher.status().is_dead() {
            self.log.error("watcher_dead", &[]);
            outcome.watcher_dead = true;
            outcome.recoveries.push(self.attempt_recovery());
        }

        outcome
    }
}
