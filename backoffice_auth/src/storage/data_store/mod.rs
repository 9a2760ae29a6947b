mod config;
mod connection;
mod types;

pub use config::{close_data_store, data_store_from_env};
pub(crate) use connection::{Backend, DataConn};
pub use types::{DataStore, PostgresDataStore, SqliteDataStore, StorePool};
