use chrono::{DateTime, Utc};

use crate::registration::errors::RegistrationError;
use crate::registration::types::{RegistrationRequest, RequestStatus};
use crate::storage::{Backend, DataConn, StorageError};

use super::postgres::*;
use super::sqlite::*;

pub(crate) struct RegistrationStore;

impl RegistrationStore {
    pub(crate) async fn init(conn: &mut DataConn) -> Result<(), StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => create_tables_sqlite(c).await,
            Backend::Postgres(c) => create_tables_postgres(c).await,
        }
    }

    #[tracing::instrument(skip(conn, request), fields(request_id = %request.id))]
    pub(crate) async fn insert(
        conn: &mut DataConn,
        request: &RegistrationRequest,
    ) -> Result<(), StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => insert_request_sqlite(c, request).await,
            Backend::Postgres(c) => insert_request_postgres(c, request).await,
        }
    }

    pub(crate) async fn get_by_id(
        conn: &mut DataConn,
        id: &str,
    ) -> Result<Option<RegistrationRequest>, RegistrationError> {
        let row = match conn.backend() {
            Backend::Sqlite(c) => get_by_id_sqlite(c, id).await?,
            Backend::Postgres(c) => get_by_id_postgres(c, id).await?,
        };
        row.map(RegistrationRequest::try_from).transpose()
    }

    pub(crate) async fn list(
        conn: &mut DataConn,
        status: Option<RequestStatus>,
    ) -> Result<Vec<RegistrationRequest>, RegistrationError> {
        let status = status.as_ref().map(RequestStatus::as_str);
        let rows = match conn.backend() {
            Backend::Sqlite(c) => list_sqlite(c, status).await?,
            Backend::Postgres(c) => list_postgres(c, status).await?,
        };
        collect(rows)
    }

    /// Pending requests, and approved ones that can still lead to a credential.
    pub(crate) async fn count_open_for_email(
        conn: &mut DataConn,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => count_open_for_email_sqlite(c, email, now).await,
            Backend::Postgres(c) => count_open_for_email_postgres(c, email, now).await,
        }
    }

    /// `pending -> approved`. Returns `0` when the request was not pending.
    #[tracing::instrument(skip(conn, request), fields(request_id = %request.id))]
    pub(crate) async fn approve(
        conn: &mut DataConn,
        request: &RegistrationRequest,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => approve_sqlite(c, request).await,
            Backend::Postgres(c) => approve_postgres(c, request).await,
        }
    }

    #[tracing::instrument(skip(conn, now))]
    pub(crate) async fn reject(
        conn: &mut DataConn,
        id: &str,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => reject_sqlite(c, id, decided_by, now).await,
            Backend::Postgres(c) => reject_postgres(c, id, decided_by, now).await,
        }
    }

    /// Mark the approval token used. Exactly one caller sees `1` for a given nonce.
    #[tracing::instrument(skip(conn, nonce, now))]
    pub(crate) async fn redeem_token(
        conn: &mut DataConn,
        id: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => redeem_token_sqlite(c, id, nonce, now).await,
            Backend::Postgres(c) => redeem_token_postgres(c, id, nonce, now).await,
        }
    }

    #[tracing::instrument(skip(conn, now))]
    pub(crate) async fn consume(
        conn: &mut DataConn,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => consume_sqlite(c, id, now).await,
            Backend::Postgres(c) => consume_postgres(c, id, now).await,
        }
    }

    pub(crate) async fn link_identity(
        conn: &mut DataConn,
        id: &str,
        auth_identity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        match conn.backend() {
            Backend::Sqlite(c) => link_identity_sqlite(c, id, auth_identity_id, now).await,
            Backend::Postgres(c) => link_identity_postgres(c, id, auth_identity_id, now).await,
        }
    }

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
