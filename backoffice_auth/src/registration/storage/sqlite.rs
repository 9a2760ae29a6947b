use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::registration::errors::RegistrationError;
use crate::registration::types::RegistrationRequest;
use crate::storage::{DB_TABLE_AUTH_IDENTITIES, DB_TABLE_REGISTRATION_REQUESTS, StorageError};

#[derive(Debug, FromRow)]
pub(super) struct RequestRow {
    id: String,
    email: String,
    display_name: String,
    role: String,
    tenant_id: Option<String>,
    status: String,
    token_nonce: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    token_redeemed_at: Option<DateTime<Utc>>,
    consumed_at: Option<DateTime<Utc>>,
    auth_identity_id: Option<String>,
    decided_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for RegistrationRequest {
    type Error = RegistrationError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(RegistrationRequest {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            role: row.role.parse()?,
            tenant_id: row.tenant_id,
            status: row.status.parse()?,
            token_expires_at: row.token_expires_at,
            token_redeemed_at: row.token_redeemed_at,
            consumed_at: row.consumed_at,
            auth_identity_id: row.auth_identity_id,
            decided_by: row.decided_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            token_nonce: row.token_nonce,
        })
    }
}

pub(super) fn collect(rows: Vec<RequestRow>) -> Result<Vec<RegistrationRequest>, RegistrationError> {
    rows.into_iter().map(RegistrationRequest::try_from).collect()
}

pub(super) async fn create_tables_sqlite(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();
    let auth_table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL,
            tenant_id TEXT,
            status TEXT NOT NULL,
            token_nonce TEXT,
            token_expires_at TIMESTAMP,
            token_redeemed_at TIMESTAMP,
            consumed_at TIMESTAMP,
            auth_identity_id TEXT REFERENCES {auth_table}(id) ON DELETE SET NULL,
            decided_by TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_email ON {table}(email)"
    ))
    .execute(&mut *conn)
    .await?;

    // one pending request per email
    sqlx::query(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_pending_email ON {table}(email) WHERE status = 'pending'"
    ))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn insert_request_sqlite(
    conn: &mut SqliteConnection,
    request: &RegistrationRequest,
) -> Result<(), StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
            (id, email, display_name, role, tenant_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#
    ))
    .bind(&request.id)
    .bind(&request.email)
    .bind(&request.display_name)
    .bind(request.role.as_str())
    .bind(&request.tenant_id)
    .bind(request.status.as_str())
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn get_by_id_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<RequestRow>, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let row = sqlx::query_as::<_, RequestRow>(&format!("SELECT * FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

pub(super) async fn list_sqlite(
    conn: &mut SqliteConnection,
    status: Option<&str>,
) -> Result<Vec<RequestRow>, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, RequestRow>(&format!(
                "SELECT * FROM {table} WHERE status = ? ORDER BY created_at ASC"
            ))
            .bind(status)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, RequestRow>(&format!(
                "SELECT * FROM {table} ORDER BY created_at ASC"
            ))
            .fetch_all(&mut *conn)
            .await?
        }
    };

    Ok(rows)
}

pub(super) async fn count_open_for_email_sqlite(
    conn: &mut SqliteConnection,
    email: &str,
    now: DateTime<Utc>,
) -> Result<i64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let count: i64 = sqlx::query_scalar(&format!(
        r#"
        SELECT COUNT(*) FROM {table}
        WHERE email = ?
          AND (status = 'pending'
               OR (status = 'approved' AND consumed_at IS NULL
                   AND (token_redeemed_at IS NOT NULL OR token_expires_at > ?)))
        "#
    ))
    .bind(email)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

pub(super) async fn approve_sqlite(
    conn: &mut SqliteConnection,
    request: &RegistrationRequest,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET status = 'approved', role = ?, tenant_id = ?, token_nonce = ?, token_expires_at = ?,
            decided_by = ?, updated_at = ?
        WHERE id = ? AND status = 'pending'
        "#
    ))
    .bind(request.role.as_str())
    .bind(&request.tenant_id)
    .bind(&request.token_nonce)
    .bind(request.token_expires_at)
    .bind(&request.decided_by)
    .bind(request.updated_at)
    .bind(&request.id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn reject_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
    decided_by: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET status = 'rejected', token_nonce = NULL, token_expires_at = NULL,
            decided_by = ?, updated_at = ?
        WHERE id = ? AND (status = 'pending' OR (status = 'approved' AND consumed_at IS NULL))
        "#
    ))
    .bind(decided_by)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn redeem_token_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
    nonce: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET token_redeemed_at = ?, updated_at = ?
        WHERE id = ? AND status = 'approved' AND token_redeemed_at IS NULL
          AND token_nonce = ? AND token_expires_at > ?
        "#
    ))
    .bind(now)
    .bind(now)
    .bind(id)
    .bind(nonce)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn consume_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET consumed_at = ?, updated_at = ?
        WHERE id = ? AND status = 'approved' AND token_redeemed_at IS NOT NULL
          AND consumed_at IS NULL
        "#
    ))
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn link_identity_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
    auth_identity_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET auth_identity_id = ?, updated_at = ? WHERE id = ?"
    ))
    .bind(auth_identity_id)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn reassign_identity_sqlite(
    conn: &mut SqliteConnection,
    from_id: &str,
    to_id: &str,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET auth_identity_id = ? WHERE auth_identity_id = ?"
    ))
    .bind(to_id)
    .bind(from_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
