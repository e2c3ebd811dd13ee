// crates/sync-engine/src/queue.rs
//! Ordered log of pending mutations

use crate::error::{SyncError, SyncResult};
use crate::types::{DeadLetter, Operation, QueueItem, QueueItemId};
use chrono::Utc;
use rehearse_core::{EntityId, EntityKind};
use rehearse_storage::StorageBackend;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Storage collection for pending items
const QUEUE_COLLECTION: &str = "sync_queue";
/// Storage collection for dead-lettered items
const DEAD_LETTER_COLLECTION: &str = "sync_dead_letters";

/// Outcome of recording a failed replay attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Item stays pending; `retry_count` after the increment
    Retained { retry_count: u32 },
    /// Item hit the retry ceiling and moved to dead-letter
    DeadLettered,
}

struct QueueInner {
    pending: Vec<QueueItem>,
    dead: Vec<DeadLetter>,
    /// Items the engine has handed to the remote and not yet resolved.
    /// These may already exist remotely, so collapse must not touch them.
    in_flight: HashSet<QueueItemId>,
    next_seq: u64,
}

/// FIFO queue of pending mutations with a dead-letter side list
///
/// Items for the same entity id replay in creation order; a delete issued
/// after an update is never applied before that update. All mutation goes
/// through one internal lock.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl SyncQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                pending: Vec::new(),
                dead: Vec::new(),
                in_flight: HashSet::new(),
                next_seq: 1,
            })),
        }
    }

    fn lock(&self) -> SyncResult<std::sync::MutexGuard<'_, QueueInner>> {
        self.inner.lock().map_err(|_| SyncError::LockPoisoned)
    }

    /// Appends a mutation and returns its id.
    ///
    /// Enqueueing a delete collapses earlier pending items for the same
    /// entity. If one of the collapsed items was a create that never reached
    /// the remote, the delete itself collapses too: the remote has never seen
    /// the entity, so the whole sequence is a local no-op and the returned id
    /// refers to an already-terminal item. Items currently in flight are
    /// exempt: the remote may already have applied them, so the delete stays
    /// queued behind them.
    pub fn enqueue(
        &self,
        op: Operation,
        entity: EntityKind,
        entity_id: EntityId,
        data: serde_json::Value,
    ) -> SyncResult<QueueItemId> {
        let mut inner = self.lock()?;
        let id = QueueItemId(inner.next_seq);
        inner.next_seq += 1;

        if op == Operation::Delete {
            let in_flight = std::mem::take(&mut inner.in_flight);
            let had_unsynced_create = inner.pending.iter().any(|i| {
                i.entity_id == entity_id && i.op == Operation::Create && !in_flight.contains(&i.id)
            });
            inner
                .pending
                .retain(|i| i.entity_id != entity_id || in_flight.contains(&i.id));
            inner.in_flight = in_flight;
            if had_unsynced_create {
                log::debug!("delete of unsynced create for {entity_id} collapsed to no-op");
                return Ok(id);
            }
        }

        inner.pending.push(QueueItem {
            id,
            op,
            entity,
            entity_id,
            data,
            timestamp: Utc::now(),
            retry_count: 0,
            last_error: None,
            not_before: None,
        });
        Ok(id)
    }

    /// Returns up to `n` items eligible for replay, oldest first.
    ///
    /// Items inside their backoff window are skipped, and so is every later
    /// item for the same entity: per-entity FIFO order must survive backoff.
    pub fn peek_batch(&self, n: usize) -> SyncResult<Vec<QueueItem>> {
        let inner = self.lock()?;
        let now = Instant::now();
        let mut held_back: HashSet<EntityId> = HashSet::new();
        let mut batch = Vec::new();

        for item in &inner.pending {
            if batch.len() >= n {
                break;
            }
            if held_back.contains(&item.entity_id) {
                continue;
            }
            if item.backing_off(now) {
                held_back.insert(item.entity_id);
                continue;
            }
            batch.push(item.clone());
        }
        Ok(batch)
    }

    /// Marks a pending item as handed to the remote. While marked, the item
    /// is shielded from delete-collapse in [`SyncQueue::enqueue`].
    pub fn mark_in_flight(&self, id: QueueItemId) -> SyncResult<()> {
        let mut inner = self.lock()?;
        if inner.pending.iter().any(|i| i.id == id) {
            inner.in_flight.insert(id);
        }
        Ok(())
    }

    /// Drops every in-flight mark. Called when a sync pass ends, covering
    /// items the pass abandoned without a terminal outcome.
    pub fn clear_in_flight(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.in_flight.clear();
        }
    }

    /// Removes an item after a terminal outcome
    pub fn remove(&self, id: QueueItemId) -> SyncResult<()> {
        let mut inner = self.lock()?;
        inner.pending.retain(|i| i.id != id);
        inner.in_flight.remove(&id);
        Ok(())
    }

    /// Records a failed replay attempt.
    ///
    /// Increments `retry_count` and stores the error. At `max_retries` the
    /// item moves to dead-letter instead of being requeued.
    pub fn record_failure(
        &self,
        id: QueueItemId,
        error: &str,
        max_retries: u32,
    ) -> SyncResult<FailureOutcome> {
        let mut inner = self.lock()?;
        inner.in_flight.remove(&id);
        let Some(pos) = inner.pending.iter().position(|i| i.id == id) else {
            return Ok(FailureOutcome::DeadLettered);
        };

        let item = &mut inner.pending[pos];
        item.retry_count += 1;
        item.last_error = Some(error.to_string());
        let retry_count = item.retry_count;

        if retry_count >= max_retries {
            let item = inner.pending.remove(pos);
            log::warn!("item {id} exhausted {max_retries} retries, dead-lettering");
            inner.dead.push(DeadLetter {
                item,
                reason: format!("retries exhausted: {error}"),
                dead_lettered_at: Utc::now(),
            });
            return Ok(FailureOutcome::DeadLettered);
        }

        Ok(FailureOutcome::Retained { retry_count })
    }

    /// Moves an item straight to dead-letter, without consuming retry budget.
    /// Used for permanent failures (validation, conflict).
    pub fn dead_letter(&self, id: QueueItemId, reason: &str) -> SyncResult<()> {
        let mut inner = self.lock()?;
        inner.in_flight.remove(&id);
        if let Some(pos) = inner.pending.iter().position(|i| i.id == id) {
            let mut item = inner.pending.remove(pos);
            item.last_error = Some(reason.to_string());
            inner.dead.push(DeadLetter {
                item,
                reason: reason.to_string(),
                dead_lettered_at: Utc::now(),
            });
        }
        Ok(())
    }

    /// Sets the backoff deadline for a pending item
    pub fn hold_until(&self, id: QueueItemId, until: Instant) -> SyncResult<()> {
        let mut inner = self.lock()?;
        if let Some(item) = inner.pending.iter_mut().find(|i| i.id == id) {
            item.not_before = Some(until);
        }
        Ok(())
    }

    /// Returns the dead-lettered items, for inspection
    pub fn dead_letters(&self) -> SyncResult<Vec<DeadLetter>> {
        Ok(self.lock()?.dead.clone())
    }

    /// Discards a dead-lettered item for good
    pub fn discard_dead_letter(&self, id: QueueItemId) -> SyncResult<()> {
        let mut inner = self.lock()?;
        inner.dead.retain(|d| d.item.id != id);
        Ok(())
    }

    /// Puts a dead-lettered item back in the pending queue with a fresh retry
    /// budget. Creation order is preserved through the original id.
    pub fn requeue_dead_letter(&self, id: QueueItemId) -> SyncResult<bool> {
        let mut inner = self.lock()?;
        let Some(pos) = inner.dead.iter().position(|d| d.item.id == id) else {
            return Ok(false);
        };
        let mut item = inner.dead.remove(pos).item;
        item.retry_count = 0;
        item.last_error = None;
        item.not_before = None;

        let insert_at = inner
            .pending
            .iter()
            .position(|i| i.id > item.id)
            .unwrap_or(inner.pending.len());
        inner.pending.insert(insert_at, item);
        Ok(true)
    }

    /// Number of pending (non-dead-letter) items
    pub fn pending_len(&self) -> usize {
        self.lock().map(|i| i.pending.len()).unwrap_or(0)
    }

    /// Returns true if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0
    }

    /// Returns true if any pending item targets the given entity
    pub fn has_pending_for(&self, entity_id: EntityId) -> bool {
        self.lock()
            .map(|i| i.pending.iter().any(|item| item.entity_id == entity_id))
            .unwrap_or(false)
    }

    /// Persists pending and dead-lettered items through the backend
    pub async fn save_to(&self, backend: &dyn StorageBackend) -> SyncResult<()> {
        let (pending, dead) = {
            let inner = self.lock()?;
            (inner.pending.clone(), inner.dead.clone())
        };

        for (key, _) in backend.iterate(QUEUE_COLLECTION).await? {
            backend.delete(QUEUE_COLLECTION, &key).await?;
        }
        for item in &pending {
            backend
                .put(
                    QUEUE_COLLECTION,
                    &format!("{:020}", item.id.0),
                    serde_json::to_value(item)?,
                )
                .await?;
        }

        for (key, _) in backend.iterate(DEAD_LETTER_COLLECTION).await? {
            backend.delete(DEAD_LETTER_COLLECTION, &key).await?;
        }
        for dl in &dead {
            backend
                .put(
                    DEAD_LETTER_COLLECTION,
                    &format!("{:020}", dl.item.id.0),
                    serde_json::to_value(dl)?,
                )
                .await?;
        }
        Ok(())
    }

    /// Restores queue contents persisted by `save_to`.
    ///
    /// Backoff deadlines are not persisted; restored items are immediately
    /// eligible, which at worst retries one attempt early.
    pub async fn load_from(backend: &dyn StorageBackend) -> SyncResult<Self> {
        let mut pending = Vec::new();
        for (_, value) in backend.iterate(QUEUE_COLLECTION).await? {
            pending.push(serde_json::from_value::<QueueItem>(value)?);
        }
        pending.sort_by_key(|i| i.id);

        let mut dead = Vec::new();
        for (_, value) in backend.iterate(DEAD_LETTER_COLLECTION).await? {
            dead.push(serde_json::from_value::<DeadLetter>(value)?);
        }

        let next_seq = pending
            .iter()
            .map(|i| i.id.0)
            .chain(dead.iter().map(|d| d.item.id.0))
            .max()
            .map_or(1, |m| m + 1);

        Ok(Self {
            inner: Arc::new(Mutex::new(QueueInner {
                pending,
                dead,
                in_flight: HashSet::new(),
                next_seq,
            })),
        })
    }
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new()
    }
}
