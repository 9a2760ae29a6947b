use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

pub struct InMemoryCacheStore {
    pub(super) entry: HashMap<String, CacheEntry>,
}

pub(super) struct CacheEntry {
    pub(super) data: CacheData,
    pub(super) expires_at: Instant,
}

pub struct RedisCacheStore {
    pub(super) client: redis::Client,
}

/// Short-lived keyed storage for ceremony challenges.
///
/// Implementations must honor the TTL given to [`CacheStore::put_with_ttl`]: an expired
/// entry is never returned by `get` or `take`.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError>;

    /// Put a value into the store with a TTL in seconds.
    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError>;

    /// Get a value from the store.
    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError>;

    /// Remove a value from the store.
    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError>;

    /// Atomically get a value and remove it, so that only one caller ever observes it.
    async fn take(&mut self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError>;
}
