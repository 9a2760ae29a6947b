use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::session::types::StoredSession;
use crate::storage::{DB_TABLE_AUTH_IDENTITIES, DB_TABLE_SESSIONS, StorageError};

pub(super) async fn create_tables_postgres(conn: &mut PgConnection) -> Result<(), StorageError> {
    let table = DB_TABLE_SESSIONS.as_str();
    let auth_table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            auth_identity_id TEXT NOT NULL REFERENCES {auth_table}(id) ON DELETE CASCADE,
            token_hash TEXT NOT NULL UNIQUE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_identity ON {table}(auth_identity_id)"
    ))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn insert_session_postgres(
    conn: &mut PgConnection,
    session: &StoredSession,
) -> Result<(), StorageError> {
    let table = DB_TABLE_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table} (id, auth_identity_id, token_hash, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#
    ))
    .bind(&session.id)
    .bind(&session.auth_identity_id)
    .bind(&session.token_hash)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn get_by_token_hash_postgres(
    conn: &mut PgConnection,
    token_hash: &str,
) -> Result<Option<StoredSession>, StorageError> {
    let table = DB_TABLE_SESSIONS.as_str();

    let session = sqlx::query_as::<_, StoredSession>(&format!(
        "SELECT * FROM {table} WHERE token_hash = $1"
    ))
    .bind(token_hash)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(session)
}

pub(super) async fn delete_by_token_hash_postgres(
    conn: &mut PgConnection,
    token_hash: &str,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE token_hash = $1"))
        .bind(token_hash)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_for_identity_postgres(
    conn: &mut PgConnection,
    auth_identity_id: &str,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE auth_identity_id = $1"))
        .bind(auth_identity_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_expired_postgres(
    conn: &mut PgConnection,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE expires_at <= $1"))
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
