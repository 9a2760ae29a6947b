use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheStore, RedisCacheStore};

/// Namespace shared with other applications on the same server.
const KEY_NAMESPACE: &str = "bo";

impl RedisCacheStore {
    /// Open a client and verify the server answers.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let store = Self {
            client: redis::Client::open(url)?,
        };
        store.init().await?;
        tracing::info!("Connected to redis cache");
        Ok(store)
    }

    async fn conn(&self) -> Result<MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

fn namespaced(prefix: &str, key: &str) -> String {
    format!("{KEY_NAMESPACE}:{prefix}:{key}")
}

fn decode(raw: Option<String>) -> Result<Option<CacheData>, StorageError> {
    raw.map(|json| serde_json::from_str(&json).map_err(StorageError::from))
        .transpose()
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn put_with_ttl(
        &mut self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(&value)?;
        let _: () = self
            .conn()
            .await?
            .set_ex(namespaced(prefix, key), json, ttl)
            .await?;
        Ok(())
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let raw: Option<String> = self.conn().await?.get(namespaced(prefix, key)).await?;
        decode(raw)
    }

    async fn remove(&mut self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let _: () = self.conn().await?.del(namespaced(prefix, key)).await?;
        Ok(())
    }

    /// GETDEL keeps a challenge single-use across every process sharing the server.
    async fn take(&mut self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let raw: Option<String> = self.conn().await?.get_del(namespaced(prefix, key)).await?;
        decode(raw)
    }
}
