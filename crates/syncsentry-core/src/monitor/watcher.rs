//! Liveness capability of an externally owned scanning process.
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::{Arc, Weak};

/// Something that can say whether the scan it drives is still running.
///
/// The monitor polls this once per tick. Implementations should answer
/// quickly and must not call back into the monitor.
pub trait Watcher: Send + Sync {
    fn is_alive(&self) -> bool;
}

/// Watcher presence and liveness as shown in a health report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatcherStatus {
    pub exists: bool,
    /// `None` when no watcher is registered.
    pub alive: Option<bool>,
}

impl WatcherStatus {
    pub fn is_dead(&self) -> bool {
        self.alive == Some(false)
    }
}

/// Non-owning slot holding the registered watcher, if any.
///
/// A watcher whose owner has dropped it is reported as dead.
#[derive(Default)]
pub(crate) struct WatcherSlot {
    inner: RwLock<Option<Weak<dyn Watcher>>>,
}

impl WatcherSlot {
    pub(crate) fn set(&self, watcher: Weak<dyn Watcher>) {
        *self.inner.write() = Some(watcher);
    }

    pub(crate) fn clear(&self) {
        *self.inner.write() = None;
    }

    /// Poll the watcher. The slot lock is released before `is_alive` runs.
    pub(crate) fn status(&self) -> WatcherStatus {
        let weak = self.inner.read().clone();
        match weak {
            None => WatcherStatus {
                exists: false,
                alive: None,
            },
            Some(weak) => WatcherStatus {
                exists: true,
                alive: Some(weak.upgrade().is_some_and(|w: Arc<dyn Watcher>| w.is_alive())),
            },
        }
    }
}
