// crates/sync-engine/src/events.rs
//! Sync lifecycle events and the notifier seam

use crate::types::{QueueItem, QueueItemId};
use tokio::sync::broadcast;

/// Lifecycle events emitted by the sync engine
///
/// Consumed by presentation layers (toast/progress UI). Produced only by the
/// engine.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A sync pass began; `total` is the batch size
    Started { total: usize },
    /// One item was confirmed by the remote
    Progress {
        done: usize,
        total: usize,
        current: QueueItemId,
    },
    /// The pass drained its batch with no unresolved failures
    Completed { applied: usize, dead_lettered: usize },
    /// The pass finished with unresolved failures, or an item dead-lettered
    /// mid-pass
    Failed { message: String },
    /// Remote state diverged; carries both versions for manual resolution
    Conflict {
        item: QueueItem,
        remote: Option<serde_json::Value>,
    },
}

/// Injectable event sink
///
/// The engine emits through this trait rather than a process-wide singleton,
/// so tests can capture events and multiple engine instances stay
/// independent.
pub trait SyncNotifier: Send + Sync {
    fn notify(&self, event: SyncEvent);
}

/// Notifier that fans events out over a tokio broadcast channel
pub struct BroadcastNotifier {
    tx: broadcast::Sender<SyncEvent>,
}

impl BroadcastNotifier {
    /// Creates a notifier with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}

impl SyncNotifier for BroadcastNotifier {
    fn notify(&self, event: SyncEvent) {
        // No receivers is fine; events are advisory
        let _ = self.tx.send(event);
    }
}

/// Notifier that drops everything, for headless use
pub struct NullNotifier;

impl SyncNotifier for NullNotifier {
    fn notify(&self, _event: SyncEvent) {}
}
