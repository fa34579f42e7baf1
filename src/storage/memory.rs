use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Cache, CacheStorage, StorageError, validate_cache_name};
use crate::fetch::{CachedResponse, RequestKey};

/// 进程内缓存存储
#[derive(Default)]
pub struct MemoryStorage {
    caches: DashMap<String, Arc<MemoryCache>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, StorageError> {
        validate_cache_name(name)?;
        let cache: Arc<dyn Cache> = self
            .caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCache::default()))
            .clone();
        Ok(cache)
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.caches.contains_key(name))
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.caches.iter().map(|c| c.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.caches.remove(name).is_some())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<RequestKey, CachedResponse>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn match_request(
        &self,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: RequestKey, response: CachedResponse) -> Result<(), StorageError> {
        self.entries.insert(key, response);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StorageError> {
        let mut keys: Vec<RequestKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}
