// crates/storage/src/memory.rs
//! In-memory storage backend

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// In-memory backend for tests and pre-persistence use
///
/// Collections are `BTreeMap`s so iteration order is deterministic.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<Mutex<BTreeMap<String, BTreeMap<String, Value>>>>,
}

impl MemoryBackend {
    /// Creates an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Returns true if the collection holds no records
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Value>> {
        let collections = self
            .collections
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn put(&self, collection: &str, key: &str, value: Value) -> StorageResult<()> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> StorageResult<()> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        if let Some(c) = collections.get_mut(collection) {
            c.remove(key);
        }
        Ok(())
    }

    async fn iterate(&self, collection: &str) -> StorageResult<Vec<(String, Value)>> {
        let collections = self
            .collections
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(collections
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
