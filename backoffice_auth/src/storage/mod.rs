mod cache_store;
mod config;
mod data_store;
mod errors;
mod retry;
mod types;

pub use cache_store::{CacheStore, InMemoryCacheStore, RedisCacheStore, cache_store_from_env};
pub use data_store::{
    DataStore, PostgresDataStore, SqliteDataStore, StorePool, close_data_store,
    data_store_from_env,
};
pub use errors::StorageError;
pub use types::CacheData;

pub(crate) use config::{
    DB_TABLE_AUTH_IDENTITIES, DB_TABLE_BUSINESS_IDENTITIES, DB_TABLE_CREDENTIALS,
    DB_TABLE_REGISTRATION_REQUESTS, DB_TABLE_SESSIONS,
};
pub(crate) use data_store::{Backend, DataConn};
pub(crate) use retry::retry_transient;
