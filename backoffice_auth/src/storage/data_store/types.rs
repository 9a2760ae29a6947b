use sqlx::{PgPool, SqlitePool};

#[derive(Clone, Debug)]
pub struct SqliteDataStore {
    pub(super) pool: SqlitePool,
}

#[derive(Clone, Debug)]
pub struct PostgresDataStore {
    pub(super) pool: PgPool,
}

/// The pool behind a [`DataStore`].
#[derive(Clone, Copy, Debug)]
pub enum StorePool<'a> {
    Sqlite(&'a SqlitePool),
    Postgres(&'a PgPool),
}

/// Relational backend holding identities, credentials, sessions and registration requests.
///
/// Every store resolves to exactly one pool; the typed accessors are views over
/// [`DataStore::pool`] for callers that only handle one backend.
pub trait DataStore: Send + Sync {
    fn pool(&self) -> StorePool<'_>;

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool() {
            StorePool::Sqlite(pool) => Some(pool),
            StorePool::Postgres(_) => None,
        }
    }

    fn as_postgres(&self) -> Option<&PgPool> {
        match self.pool() {
            StorePool::Postgres(pool) => Some(pool),
            StorePool::Sqlite(_) => None,
        }
    }
}

impl DataStore for SqliteDataStore {
    fn pool(&self) -> StorePool<'_> {
        StorePool::Sqlite(&self.pool)
    }
}

impl DataStore for PostgresDataStore {
    fn pool(&self) -> StorePool<'_> {
        StorePool::Postgres(&self.pool)
    }
}
