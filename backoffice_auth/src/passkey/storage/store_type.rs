use chrono::{DateTime, Utc};

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::PasskeyCredential;
use crate::storage::{Backend, DataConn, StorageError};

use super::postgres::*;
use super::sqlite::*;

pub(crate) struct PasskeyStore;

impl PasskeyStore {
    pub(crate) async fn init(conn: &mut DataConn) -> Result<(), StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => create_tables_sqlite(c).await,
            Backend::Postgres(c) => create_tables_postgres(c).await,
        }
    }

    #[tracing::instrument(skip(conn, credential), fields(identity_id = %credential.auth_identity_id))]
    pub(crate) async fn insert(
        conn: &mut DataConn,
        credential: &PasskeyCredential,
    ) -> Result<(), StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => insert_credential_sqlite(c, credential).await,
            Backend::Postgres(c) => insert_credential_postgres(c, credential).await,
        }
    }

    pub(crate) async fn get_by_id(
        conn: &mut DataConn,
        id: &str,
    ) -> Result<Option<PasskeyCredential>, PasskeyError> {
        let row = match conn.backend() {
            Backend::Sqlite(c) => get_by_id_sqlite(c, id).await?,
            Backend::Postgres(c) => get_by_id_postgres(c, id).await?,
        };
        row.map(PasskeyCredential::try_from).transpose()
    }

    pub(crate) async fn get_by_external_id(
        conn: &mut DataConn,
        external_credential_id: &str,
    ) -> Result<Option<PasskeyCredential>, PasskeyError> {
        let row = match conn.backend() {
            Backend::Sqlite(c) => get_by_external_id_sqlite(c, external_credential_id).await?,
            Backend::Postgres(c) => get_by_external_id_postgres(c, external_credential_id).await?,
        };
        row.map(PasskeyCredential::try_from).transpose()
    }

    pub(crate) async fn list_for_identity(
        conn: &mut DataConn,
        auth_identity_id: &str,
    ) -> Result<Vec<PasskeyCredential>, PasskeyError> {
        let rows = match conn.backend() {
            Backend::Sqlite(c) => list_for_identity_sqlite(c, auth_identity_id).await?,
            Backend::Postgres(c) => list_for_identity_postgres(c, auth_identity_id).await?,
        };
        collect(rows)
    }

    /// Store `counter` only if it is strictly greater than the stored value.
    /// Returns the number of rows changed, so `0` means the counter did not advance.
    pub(crate) async fn advance_counter(
        conn: &mut DataConn,
        external_credential_id: &str,
        counter: u32,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let counter = i64::from(counter);
        match conn.backend() {
            Backend::Sqlite(c) => {
                advance_counter_sqlite(c, external_credential_id, counter, now).await
            }
            Backend::Postgres(c) => {
                advance_counter_postgres(c, external_credential_id, counter, now).await
            }
        }
    }

    /// Record a use of an authenticator that never increments its counter.
    pub(crate) async fn touch_zero_counter(
        conn: &mut DataConn,
        external_credential_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => touch_zero_counter_sqlite(c, external_credential_id, now).await,
            Backend::Postgres(c) => {
                touch_zero_counter_postgres(c, external_credential_id, now).await
            }
        }
    }

    #[tracing::instrument(skip(conn))]
    pub(crate) async fn delete(conn: &mut DataConn, id: &str) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => delete_by_id_sqlite(c, id).await,
            Backend::Postgres(c) => delete_by_id_postgres(c, id).await,
        }
    }

    /// Move every credential of `from_id` to `to_id`.
    #[tracing::instrument(skip(conn))]
    pub(crate) async fn reassign_identity(
        conn: &mut DataConn,
        from_id: &str,
        to_id: &str,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => reassign_identity_sqlite(c, from_id, to_id).await,
            Backend::Postgres(c) => reassign_identity_postgres(c, from_id, to_id).await,
        }
    }
}
