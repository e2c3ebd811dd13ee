// crates/storage/src/lib.rs
//! Local durable storage for the offline sync core
//!
//! This crate defines the persistence collaborator boundary:
//! - `StorageBackend`: get/put/delete/iterate keyed by collection
//! - `MemoryBackend`: in-memory implementation (tests, pre-persistence use)
//! - `QuotaProbe` / `QuotaGuard`: storage capacity reporting and thresholding
//!
//! The sync core only requires these semantics; a durable backend (IndexedDB,
//! SQLite, flat files) plugs in behind `StorageBackend` without touching the
//! engine.

mod backend;
mod error;
mod memory;
mod quota;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use quota::{FixedQuotaProbe, QuotaGuard, QuotaProbe, StorageQuota};
