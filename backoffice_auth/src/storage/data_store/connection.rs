use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, Postgres, Sqlite, SqliteConnection, Transaction};

use crate::storage::errors::StorageError;

use super::types::{DataStore, StorePool};

/// A pooled connection or an open transaction on either backend.
///
/// Store functions take `&mut DataConn` so the same code path runs both standalone
/// and inside a caller's transaction.
pub(crate) enum DataConn {
    Sqlite(PoolConnection<Sqlite>),
    Postgres(PoolConnection<Postgres>),
    SqliteTx(Transaction<'static, Sqlite>),
    PostgresTx(Transaction<'static, Postgres>),
}

/// Borrowed backend connection handed to the sqlite/postgres implementations.
pub(crate) enum Backend<'a> {
    Sqlite(&'a mut SqliteConnection),
    Postgres(&'a mut PgConnection),
}

impl DataConn {
    pub(crate) async fn acquire(store: &dyn DataStore) -> Result<Self, StorageError> {
        Ok(match store.pool() {
            StorePool::Sqlite(pool) => Self::Sqlite(pool.acquire().await?),
            StorePool::Postgres(pool) => Self::Postgres(pool.acquire().await?),
        })
    }

    pub(crate) async fn begin(store: &dyn DataStore) -> Result<Self, StorageError> {
        Ok(match store.pool() {
            StorePool::Sqlite(pool) => Self::SqliteTx(pool.begin().await?),
            StorePool::Postgres(pool) => Self::PostgresTx(pool.begin().await?),
        })
    }

    /// Commit when this is a transaction; a plain connection returns to the pool.
    pub(crate) async fn commit(self) -> Result<(), StorageError> {
        match self {
            Self::SqliteTx(tx) => tx.commit().await?,
            Self::PostgresTx(tx) => tx.commit().await?,
            Self::Sqlite(_) | Self::Postgres(_) => {}
        }
        Ok(())
    }

    pub(crate) async fn rollback(self) -> Result<(), StorageError> {
        match self {
            Self::SqliteTx(tx) => tx.rollback().await?,
            Self::PostgresTx(tx) => tx.rollback().await?,
            Self::Sqlite(_) | Self::Postgres(_) => {}
        }
        Ok(())
    }

    pub(crate) fn backend(&mut self) -> Backend<'_> {
        match self {
            Self::Sqlite(conn) => Backend::Sqlite(&mut **conn),
            Self::Postgres(conn) => Backend::Postgres(&mut **conn),
            Self::SqliteTx(tx) => Backend::Sqlite(&mut **tx),
            Self::PostgresTx(tx) => Backend::Postgres(&mut **tx),
        }
    }
}
