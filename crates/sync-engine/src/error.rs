// crates/sync-engine/src/error.rs
//! Error taxonomy for sync operations

use rehearse_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization
///
/// The variants encode the retry classification the engine acts on:
/// - `Transient` is retried with exponential backoff
/// - `Conflict` and `Validation` are permanent; the item is dead-lettered
/// - `Capacity` rejects the write up front, nothing is queued
/// - `Unauthorized` aborts the sync pass; items stay pending
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network blip or timeout, expected to succeed on retry
    #[error("Transient network error: {0}")]
    Transient(String),

    /// Remote state diverged from local; surfaced for manual resolution,
    /// never auto-resolved
    #[error("Conflict on {entity_id}: {message}")]
    Conflict {
        entity_id: String,
        message: String,
        /// Remote version of the entity, when the collaborator returned one
        remote: Option<serde_json::Value>,
    },

    /// Local storage over threshold; the write is rejected immediately
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// Remote rejected the payload; will not succeed without intervention
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Authorization failure; the pass aborts as non-retryable
    #[error("Unauthorized")]
    Unauthorized,

    /// Local storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal lock poisoned
    #[error("Sync lock poisoned")]
    LockPoisoned,
}

impl SyncError {
    /// Returns true if a retry with backoff is expected to succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns true if the failure will not succeed without intervention
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Validation(_))
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::CapacityExceeded { .. } => Self::Capacity(err.to_string()),
            StorageError::Serialization(e) => Self::Serialization(e),
            StorageError::LockPoisoned => Self::LockPoisoned,
            other => Self::Storage(other.to_string()),
        }
    }
}
