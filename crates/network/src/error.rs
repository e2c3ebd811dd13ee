// crates/network/src/error.rs
//! Error types for network operations

use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during reachability checks
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No probe target could be reached
    #[error("Network unavailable")]
    NetworkUnavailable,

    /// Probe request failed
    #[error("Probe request failed: {0}")]
    Probe(#[from] reqwest::Error),

    /// Probe timed out
    #[error("Probe timed out after {seconds}s")]
    Timeout { seconds: u64 },
}
