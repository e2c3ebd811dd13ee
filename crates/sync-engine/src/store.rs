// crates/sync-engine/src/store.rs
//! Local entity store with queue-append side effect

use crate::error::SyncResult;
use crate::queue::SyncQueue;
use crate::types::{Operation, StoredEntity};
use chrono::{DateTime, Utc};
use rehearse_core::{Entity, EntityId, EntityKind, SyncMeta};
use rehearse_storage::{QuotaGuard, StorageBackend};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Local cache of domain entities with sync bookkeeping
///
/// Every user-originated `upsert`/`delete` commits locally and appends the
/// matching queue item under one lock, so a crash can never leave a dirty
/// entity without its queue item. Remote-confirmed state goes through
/// `apply_remote`, which skips the queue. All operations are local-only and
/// never block on network.
#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn StorageBackend>,
    queue: SyncQueue,
    quota: QuotaGuard,
    /// Serializes the commit + enqueue pair against concurrent writers
    write_lock: Arc<Mutex<()>>,
}

impl EntityStore {
    /// Creates a store over a backend, sharing the queue with the engine
    pub fn new(backend: Arc<dyn StorageBackend>, queue: SyncQueue, quota: QuotaGuard) -> Self {
        Self {
            backend,
            queue,
            quota,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads an entity; `None` is an ordinary result, not an error
    pub async fn get(&self, kind: EntityKind, id: EntityId) -> SyncResult<Option<StoredEntity>> {
        let value = self.backend.get(kind.collection(), &id.as_string()).await?;
        match value {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Commits a user-originated mutation and queues it for replay.
    ///
    /// Marks the entity dirty and clears `synced_at`. Large payloads are
    /// checked against the quota guard first and rejected with a capacity
    /// error when local storage is over threshold.
    pub async fn upsert(&self, entity: Entity) -> SyncResult<()> {
        self.quota.check_write(payload_bytes(&entity))?;

        let _guard = self.write_lock.lock().await;
        let kind = entity.kind();
        let id = entity.id();

        let existed = self
            .backend
            .get(kind.collection(), &id.as_string())
            .await?
            .is_some();
        let op = if existed {
            Operation::Update
        } else {
            Operation::Create
        };

        let record = StoredEntity::dirty(entity);
        let data = serde_json::to_value(&record.entity)?;
        self.backend
            .put(kind.collection(), &id.as_string(), serde_json::to_value(&record)?)
            .await?;
        self.queue.enqueue(op, kind, id, data)?;
        Ok(())
    }

    /// Applies remote-confirmed state without re-queuing
    pub async fn apply_remote(&self, entity: Entity, synced_at: DateTime<Utc>) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let kind = entity.kind();
        let id = entity.id();
        let record = StoredEntity::synced(entity, synced_at);
        self.backend
            .put(kind.collection(), &id.as_string(), serde_json::to_value(&record)?)
            .await?;
        Ok(())
    }

    /// Marks an entity clean after a successful remote apply.
    ///
    /// If a newer mutation for the entity was queued while the applied one
    /// was in flight, the record stays dirty and only `synced_at` advances.
    pub async fn mark_synced(
        &self,
        kind: EntityKind,
        id: EntityId,
        at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let Some(value) = self.backend.get(kind.collection(), &id.as_string()).await? else {
            // Deleted locally while its create/update was in flight; the
            // delete item is still queued and will reconcile it
            return Ok(());
        };
        let mut record: StoredEntity = serde_json::from_value(value)?;
        if self.queue.has_pending_for(id) {
            record.meta.synced_at = Some(at);
        } else {
            record.meta = SyncMeta::synced(at);
        }
        self.backend
            .put(kind.collection(), &id.as_string(), serde_json::to_value(&record)?)
            .await?;
        Ok(())
    }

    /// Deletes a user-originated entity and queues the delete for replay
    pub async fn delete(&self, kind: EntityKind, id: EntityId) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        self.backend
            .delete(kind.collection(), &id.as_string())
            .await?;
        self.queue
            .enqueue(Operation::Delete, kind, id, json!({ "id": id.as_string() }))?;
        Ok(())
    }

    /// Removes a remote-confirmed deletion locally, skipping the queue
    pub async fn apply_remote_delete(&self, kind: EntityKind, id: EntityId) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        self.backend
            .delete(kind.collection(), &id.as_string())
            .await?;
        Ok(())
    }

    /// Returns all dirty entities in a collection
    pub async fn dirty_entities(&self, kind: EntityKind) -> SyncResult<Vec<StoredEntity>> {
        let mut dirty = Vec::new();
        for (_, value) in self.backend.iterate(kind.collection()).await? {
            let record: StoredEntity = serde_json::from_value(value)?;
            if record.meta.is_dirty {
                dirty.push(record);
            }
        }
        Ok(dirty)
    }

    /// Current storage usage snapshot
    pub fn quota(&self) -> rehearse_storage::StorageQuota {
        self.quota.snapshot()
    }

    /// Updates the large-write rejection threshold, in percent used
    pub fn set_quota_threshold(&self, percent: f64) {
        self.quota.set_threshold(percent);
    }
}

fn payload_bytes(entity: &Entity) -> u64 {
    match entity {
        // Recorded audio dominates a session's footprint
        Entity::Session(s) => s.payload_bytes,
        _ => 0,
    }
}
