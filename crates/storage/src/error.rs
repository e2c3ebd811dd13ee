// crates/storage/src/error.rs
//! Error types for storage operations

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in the storage layer
///
/// Not-found is deliberately absent: lookups return `Option`, because a
/// missing record is an ordinary business state, not a failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend-specific failure (I/O, driver, corruption)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Write rejected because local storage is over the configured threshold
    #[error("Storage capacity exceeded: {used_percent:.1}% used, threshold {threshold_percent:.1}%")]
    CapacityExceeded {
        used_percent: f64,
        threshold_percent: f64,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal lock poisoned
    #[error("Storage lock poisoned")]
    LockPoisoned,
}
