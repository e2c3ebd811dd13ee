// crates/sync-engine/src/config.rs
//! Sync engine configuration

use std::time::Duration;

/// Configuration for the sync engine
///
/// Settable at initialization and mutable at runtime through
/// `SyncEngine::update_config`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Run a sync pass automatically when connectivity is regained
    pub auto_sync: bool,
    /// Periodic reconciliation interval while online
    pub sync_interval: Duration,
    /// Failed attempts before an item is dead-lettered
    pub max_retries: u32,
    /// Base backoff unit for transient failures
    pub retry_delay: Duration,
    /// Cap on the exponential backoff delay
    pub max_backoff: Duration,
    /// Storage usage percentage above which large offline writes are rejected
    pub quota_threshold_percent: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: Duration::from_secs(5 * 60),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            quota_threshold_percent: 90.0,
        }
    }
}
