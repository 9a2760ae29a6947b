use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheEntry, CacheStore, InMemoryCacheStore};

impl InMemoryCacheStore {
    pub fn new() -> Self {
        tracing::info!("Using in-memory challenge cache; challenges do not survive a restart");
        Self {
            entry: HashMap::new(),
        }
    }
}

fn entry_key(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let key = entry_key(prefix, key);
        let now = Instant::now();
        // Expired entries are dropped lazily on write.
        self.entry.retain(|_, e| e.expires_at > now);
        self.entry.insert(
            key,
            CacheEntry {
                data: value,
                expires_at: now + Duration::from_secs(ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let key = entry_key(prefix, key);
        Ok(self
            .entry
            .get(&key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.data.clone()))
    }

    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let key = entry_key(prefix, key);
        self.entry.remove(&key);
        Ok(())
    }

    async fn take(&mut self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let key = entry_key(prefix, key);
        Ok(self
            .entry
            .remove(&key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.data))
    }
}
