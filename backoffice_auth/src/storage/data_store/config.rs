//! Data store construction

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{env, str::FromStr, sync::Arc};

use crate::storage::errors::StorageError;

use super::types::{DataStore, PostgresDataStore, SqliteDataStore, StorePool};

impl SqliteDataStore {
    /// Lazily connecting pool; the database file is created when missing.
    pub fn connect_lazy(url: &str) -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        Ok(Self {
            pool: sqlx::sqlite::SqlitePool::connect_lazy_with(opts),
        })
    }

    /// Private in-memory database on a single pinned connection.
    ///
    /// Every statement shares that connection, so callers must not hold a transaction
    /// while acquiring a second connection.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }
}

impl PostgresDataStore {
    pub fn connect_lazy(url: &str) -> Result<Self, StorageError> {
        Ok(Self {
            pool: sqlx::PgPool::connect_lazy(url)?,
        })
    }
}

/// Build the data store selected by `GENERIC_DATA_STORE_TYPE` and `GENERIC_DATA_STORE_URL`.
pub fn data_store_from_env() -> Result<Arc<dyn DataStore>, StorageError> {
    let store_type = env::var("GENERIC_DATA_STORE_TYPE")
        .map_err(|_| StorageError::Storage("GENERIC_DATA_STORE_TYPE must be set".into()))?;
    let store_url = env::var("GENERIC_DATA_STORE_URL")
        .map_err(|_| StorageError::Storage("GENERIC_DATA_STORE_URL must be set".into()))?;

    tracing::info!(store_type = %store_type, "Initializing data store");

    let store: Arc<dyn DataStore> = match store_type.as_str() {
        "sqlite" => Arc::new(SqliteDataStore::connect_lazy(&store_url)?),
        "postgres" => Arc::new(PostgresDataStore::connect_lazy(&store_url)?),
        t => {
            return Err(StorageError::Storage(format!(
                "Unsupported store type: {t}. Supported types are 'sqlite' and 'postgres'"
            )));
        }
    };

    Ok(store)
}

/// Close whichever pool backs the store.
pub async fn close_data_store(store: &dyn DataStore) {
    match store.pool() {
        StorePool::Sqlite(pool) => pool.close().await,
        StorePool::Postgres(pool) => pool.close().await,
    }
}
