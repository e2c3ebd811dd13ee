// crates/storage/src/backend.rs
//! Storage backend trait

use crate::error::StorageResult;
use async_trait::async_trait;
use serde_json::Value;

/// Durable key-value storage keyed by collection
///
/// The sync core persists Entity Store records and Sync Queue contents
/// through this boundary so both survive application restarts. Keys are
/// unique within a collection.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads a record; `None` if absent
    async fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Value>>;

    /// Writes or replaces a record
    async fn put(&self, collection: &str, key: &str, value: Value) -> StorageResult<()>;

    /// Deletes a record; deleting an absent key is not an error
    async fn delete(&self, collection: &str, key: &str) -> StorageResult<()>;

    /// Returns all `(key, value)` pairs in a collection, key-ordered
    async fn iterate(&self, collection: &str) -> StorageResult<Vec<(String, Value)>>;

    /// Approximate bytes used across all collections.
    /// Default implementation sums serialized record sizes.
    async fn used_bytes(&self, collections: &[&str]) -> StorageResult<u64> {
        let mut total = 0u64;
        for collection in collections {
            for (key, value) in self.iterate(collection).await? {
                total += key.len() as u64 + value.to_string().len() as u64;
            }
        }
        Ok(total)
    }
}
