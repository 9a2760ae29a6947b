use chrono::{DateTime, Utc};

use crate::session::types::StoredSession;
use crate::storage::{Backend, DataConn, StorageError};

use super::postgres::*;
use super::sqlite::*;

pub(crate) struct SessionStore;

impl SessionStore {
    pub(crate) async fn init(conn: &mut DataConn) -> Result<(), StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => create_tables_sqlite(c).await,
            Backend::Postgres(c) => create_tables_postgres(c).await,
        }
    }

    #[tracing::instrument(skip(conn, session), fields(identity_id = %session.auth_identity_id))]
    pub(crate) async fn insert(
        conn: &mut DataConn,
        session: &StoredSession,
    ) -> Result<(), StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => insert_session_sqlite(c, session).await,
            Backend::Postgres(c) => insert_session_postgres(c, session).await,
        }
    }

    pub(crate) async fn get_by_token_hash(
        conn: &mut DataConn,
        token_hash: &str,
    ) -> Result<Option<StoredSession>, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => get_by_token_hash_sqlite(c, token_hash).await,
            Backend::Postgres(c) => get_by_token_hash_postgres(c, token_hash).await,
        }
    }

    pub(crate) async fn delete_by_token_hash(
        conn: &mut DataConn,
        token_hash: &str,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => delete_by_token_hash_sqlite(c, token_hash).await,
            Backend::Postgres(c) => delete_by_token_hash_postgres(c, token_hash).await,
        }
    }

    /// Remove every session of an identity and return how many went.
    #[tracing::instrument(skip(conn))]
    pub(crate) async fn delete_for_identity(
        conn: &mut DataConn,
        auth_identity_id: &str,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => delete_for_identity_sqlite(c, auth_identity_id).await,
            Backend::Postgres(c) => delete_for_identity_postgres(c, auth_identity_id).await,
        }
    }

    pub(crate) async fn delete_expired(
        conn: &mut DataConn,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => delete_expired_sqlite(c, now).await,
            Backend::Postgres(c) => delete_expired_postgres(c, now).await,
        }
    }
}
