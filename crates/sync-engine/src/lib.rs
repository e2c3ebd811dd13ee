// crates/sync-engine/src/lib.rs
//! Offline-first synchronization engine
//!
//! Local mutations commit immediately to the entity store and append to an
//! ordered sync queue; when connectivity allows, the engine replays the queue
//! against a remote-apply collaborator with per-item retry/backoff and emits
//! lifecycle events for presentation layers.
//!
//! # Example
//!
//! ```no_run
//! use rehearse_sync_engine::{
//!     EntityStore, NullNotifier, SyncConfig, SyncEngine, SyncQueue,
//! };
//! use rehearse_storage::{FixedQuotaProbe, MemoryBackend, QuotaGuard};
//! use std::sync::Arc;
//!
//! # use rehearse_sync_engine::{ApplyAck, Operation, RemoteApply, SyncResult};
//! # use rehearse_core::{EntityId, EntityKind};
//! # struct Api;
//! # #[async_trait::async_trait]
//! # impl RemoteApply for Api {
//! #     async fn apply(&self, _: Operation, _: EntityKind, _: EntityId,
//! #         _: &serde_json::Value) -> SyncResult<ApplyAck> { Ok(ApplyAck::default()) }
//! # }
//! let queue = SyncQueue::new();
//! let quota = QuotaGuard::new(Arc::new(FixedQuotaProbe::new(0, 1 << 30)), 90.0);
//! let store = EntityStore::new(Arc::new(MemoryBackend::new()), queue.clone(), quota);
//! let engine = SyncEngine::new(
//!     SyncConfig::default(),
//!     store,
//!     queue,
//!     Arc::new(Api),
//!     Arc::new(NullNotifier),
//! );
//! ```

mod backoff;
mod config;
mod engine;
mod error;
mod events;
mod queue;
mod remote;
mod store;
mod types;

pub use backoff::BackoffPolicy;
pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use events::{BroadcastNotifier, NullNotifier, SyncEvent, SyncNotifier};
pub use queue::{FailureOutcome, SyncQueue};
pub use remote::{ApplyAck, RemoteApply};
pub use store::EntityStore;
pub use types::{
    DeadLetter, Operation, QueueItem, QueueItemId, StoredEntity, SyncReport, SyncStatus,
};
