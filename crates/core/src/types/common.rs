// crates/core/src/types/common.rs
//! Entity identifiers, collection kinds, and sync metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a synced entity, client- or server-assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity id (client-assigned)
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an EntityId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the id as a string
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The synced collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Practice scenario definition
    Scenario,
    /// Recorded practice session
    Session,
    /// Aggregated progress record
    Progress,
}

impl EntityKind {
    /// Returns the collection name used as a storage key prefix
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Scenario => "scenarios",
            Self::Session => "sessions",
            Self::Progress => "progress",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection())
    }
}

/// Per-entity sync bookkeeping
///
/// `is_dirty = false` guarantees there is no pending queue item for this
/// entity newer than `synced_at`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncMeta {
    /// True if local state has unsynced changes
    pub is_dirty: bool,
    /// Last successful remote sync; `None` means never synced
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncMeta {
    /// Metadata for a freshly mutated local entity
    pub fn dirty() -> Self {
        Self {
            is_dirty: true,
            synced_at: None,
        }
    }

    /// Metadata for an entity confirmed by the remote at `at`
    pub fn synced(at: DateTime<Utc>) -> Self {
        Self {
            is_dirty: false,
            synced_at: Some(at),
        }
    }

    /// Returns true if this entity has never reached the remote
    pub fn never_synced(&self) -> bool {
        self.synced_at.is_none()
    }
}

impl Default for SyncMeta {
    fn default() -> Self {
        Self::dirty()
    }
}
