// crates/sync-engine/src/types.rs
//! Queue items and sync status types

use chrono::{DateTime, Utc};
use rehearse_core::{Entity, EntityId, EntityKind, SyncMeta};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Queue item identifier: monotonically creation-ordered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct QueueItemId(pub u64);

impl std::fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Mutation kind replayed against the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// A pending mutation awaiting replay
///
/// Immutable after creation except for `retry_count`, `last_error`, and the
/// transient backoff deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub op: Operation,
    /// Target collection
    pub entity: EntityKind,
    /// Target entity; per-entity replay order is keyed on this
    pub entity_id: EntityId,
    /// Full payload for create/update, identifying fragment for delete
    pub data: serde_json::Value,
    /// Creation time; defines replay order
    pub timestamp: DateTime<Utc>,
    /// Failed replay attempts so far; only ever increases
    pub retry_count: u32,
    /// Last failure description, for diagnostics
    pub last_error: Option<String>,
    /// Backoff eligibility deadline; not persisted, rebuilt on restart
    #[serde(skip)]
    pub not_before: Option<Instant>,
}

impl QueueItem {
    /// Returns true if the item is still inside its backoff window at `now`
    pub fn backing_off(&self, now: Instant) -> bool {
        self.not_before.is_some_and(|t| t > now)
    }
}

/// A queue item removed from normal retry flow, retained for inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub item: QueueItem,
    /// Why the item was parked
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Sync engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Error,
}

/// An entity as held by the local store, with its sync bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub entity: Entity,
    pub meta: SyncMeta,
}

impl StoredEntity {
    /// Wraps a freshly mutated local entity
    pub fn dirty(entity: Entity) -> Self {
        Self {
            entity,
            meta: SyncMeta::dirty(),
        }
    }

    /// Wraps an entity confirmed by the remote at `at`
    pub fn synced(entity: Entity, at: DateTime<Utc>) -> Self {
        Self {
            entity,
            meta: SyncMeta::synced(at),
        }
    }
}

/// Summary of one sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Items confirmed by the remote and removed from the queue
    pub applied: usize,
    /// Items moved to dead-letter during this pass
    pub dead_lettered: usize,
    /// Items that failed transiently and stay pending with backoff
    pub retained: usize,
    /// True if the pass stopped early on cancellation
    pub cancelled: bool,
}

impl SyncReport {
    /// Returns true if the pass drained its batch with no unresolved failures
    pub fn is_clean(&self) -> bool {
        self.dead_lettered == 0 && self.retained == 0 && !self.cancelled
    }
}
