//! In-process cache storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheKey, CacheStorage, CacheStore, StorageError};
use crate::Response;

/// Named caches held in memory. Clones share the same caches.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stores: Arc<RwLock<BTreeMap<String, MemoryStore>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A single in-memory cache. Clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<CacheKey, Response>>>,
}

impl MemoryStore {
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.clone(), response.clone());
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    type Store = MemoryStore;

    async fn open(&self, name: &str) -> Result<MemoryStore, StorageError> {
        let mut stores = self.stores.write().await;
        Ok(stores.entry(name.to_owned()).or_default().clone())
    }

    async fn names(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.stores.write().await.remove(name).is_some())
    }
}
