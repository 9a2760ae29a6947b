use std::env;

use crate::storage::errors::StorageError;

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore};

/// Build the cache store selected by `GENERIC_CACHE_STORE_TYPE` (`memory` or `redis`).
///
/// `GENERIC_CACHE_STORE_URL` is only read for `redis`.
pub async fn cache_store_from_env() -> Result<Box<dyn CacheStore>, StorageError> {
    let store_type = env::var("GENERIC_CACHE_STORE_TYPE").unwrap_or_else(|_| "memory".into());

    tracing::info!(store_type = %store_type, "Initializing cache store");

    let store: Box<dyn CacheStore> = match store_type.as_str() {
        "memory" => Box::new(InMemoryCacheStore::new()),
        "redis" => {
            let url = env::var("GENERIC_CACHE_STORE_URL").map_err(|_| {
                StorageError::Storage("GENERIC_CACHE_STORE_URL must be set for redis".into())
            })?;
            Box::new(RedisCacheStore::connect(&url).await?)
        }
        t => {
            return Err(StorageError::Storage(format!(
                "Unsupported cache store type: {t}. Supported types are 'memory' and 'redis'"
            )));
        }
    };

    Ok(store)
}
