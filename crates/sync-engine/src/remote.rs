// crates/sync-engine/src/remote.rs
//! Remote-apply collaborator boundary

use crate::error::SyncResult;
use crate::types::Operation;
use async_trait::async_trait;
use rehearse_core::{EntityId, EntityKind};
use serde_json::Value;

/// Acknowledgement from a successful remote apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyAck {
    /// Canonical server-assigned id, when the server re-keys the entity
    pub canonical_id: Option<String>,
    /// Server-side version after the apply
    pub version: Option<u64>,
}

/// The sole network dependency of the sync core
///
/// Implementations are assumed idempotent per item: replaying the same
/// mutation after an ambiguous network failure must yield the same remote
/// state as applying it once. Failures must be classified through the
/// `SyncError` taxonomy so the engine can decide between retry, dead-letter,
/// and pass abort.
#[async_trait]
pub trait RemoteApply: Send + Sync {
    /// Applies one mutation against the remote system
    async fn apply(
        &self,
        op: Operation,
        entity: EntityKind,
        entity_id: EntityId,
        data: &Value,
    ) -> SyncResult<ApplyAck>;
}
