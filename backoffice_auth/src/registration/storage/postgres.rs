use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::registration::types::RegistrationRequest;
use crate::storage::{DB_TABLE_AUTH_IDENTITIES, DB_TABLE_REGISTRATION_REQUESTS, StorageError};

use super::sqlite::RequestRow;

pub(super) async fn create_tables_postgres(conn: &mut PgConnection) -> Result<(), StorageError> {
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
            token_expires_at TIMESTAMPTZ,
            token_redeemed_at TIMESTAMPTZ,
            consumed_at TIMESTAMPTZ,
            auth_identity_id TEXT REFERENCES {auth_table}(id) ON DELETE SET NULL,
            decided_by TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
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

pub(super) async fn insert_request_postgres(
    conn: &mut PgConnection,
    request: &RegistrationRequest,
) -> Result<(), StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
            (id, email, display_name, role, tenant_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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

pub(super) async fn get_by_id_postgres(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<RequestRow>, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let row = sqlx::query_as::<_, RequestRow>(&format!("SELECT * FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

pub(super) async fn list_postgres(
    conn: &mut PgConnection,
    status: Option<&str>,
) -> Result<Vec<RequestRow>, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, RequestRow>(&format!(
                "SELECT * FROM {table} WHERE status = $1 ORDER BY created_at ASC"
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

pub(super) async fn count_open_for_email_postgres(
    conn: &mut PgConnection,
    email: &str,
    now: DateTime<Utc>,
) -> Result<i64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let count: i64 = sqlx::query_scalar(&format!(
        r#"
        SELECT COUNT(*) FROM {table}
        WHERE email = $1
          AND (status = 'pending'
               OR (status = 'approved' AND consumed_at IS NULL
                   AND (token_redeemed_at IS NOT NULL OR token_expires_at > $2)))
        "#
    ))
    .bind(email)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

pub(super) async fn approve_postgres(
    conn: &mut PgConnection,
    request: &RegistrationRequest,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET status = 'approved', role = $1, tenant_id = $2, token_nonce = $3, token_expires_at = $4,
            decided_by = $5, updated_at = $6
        WHERE id = $7 AND status = 'pending'
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

pub(super) async fn reject_postgres(
    conn: &mut PgConnection,
    id: &str,
    decided_by: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET status = 'rejected', token_nonce = NULL, token_expires_at = NULL,
            decided_by = $1, updated_at = $2
        WHERE id = $3 AND (status = 'pending' OR (status = 'approved' AND consumed_at IS NULL))
        "#
    ))
    .bind(decided_by)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn redeem_token_postgres(
    conn: &mut PgConnection,
    id: &str,
    nonce: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET token_redeemed_at = $1, updated_at = $2
        WHERE id = $3 AND status = 'approved' AND token_redeemed_at IS NULL
          AND token_nonce = $4 AND token_expires_at > $5
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

pub(super) async fn consume_postgres(
    conn: &mut PgConnection,
    id: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET consumed_at = $1, updated_at = $2
        WHERE id = $3 AND status = 'approved' AND token_redeemed_at IS NOT NULL
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

pub(super) async fn link_identity_postgres(
    conn: &mut PgConnection,
    id: &str,
    auth_identity_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET auth_identity_id = $1, updated_at = $2 WHERE id = $3"
    ))
    .bind(auth_identity_id)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn reassign_identity_postgres(
    conn: &mut PgConnection,
    from_id: &str,
    to_id: &str,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_REGISTRATION_REQUESTS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET auth_identity_id = $1 WHERE auth_identity_id = $2"
    ))
    .bind(to_id)
    .bind(from_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
