use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::passkey::types::PasskeyCredential;
use crate::storage::{DB_TABLE_AUTH_IDENTITIES, DB_TABLE_CREDENTIALS, StorageError};

use super::sqlite::CredentialRow;

pub(super) async fn create_tables_postgres(conn: &mut PgConnection) -> Result<(), StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();
    let auth_table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            auth_identity_id TEXT NOT NULL REFERENCES {auth_table}(id) ON DELETE CASCADE,
            external_credential_id TEXT NOT NULL UNIQUE,
            public_key TEXT NOT NULL,
            sign_counter BIGINT NOT NULL DEFAULT 0,
            device_type TEXT NOT NULL,
            aaguid TEXT NOT NULL,
            user_handle TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            last_used_at TIMESTAMPTZ
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

pub(super) async fn insert_credential_postgres(
    conn: &mut PgConnection,
    credential: &PasskeyCredential,
) -> Result<(), StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
            (id, auth_identity_id, external_credential_id, public_key, sign_counter,
             device_type, aaguid, user_handle, created_at, last_used_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#
    ))
    .bind(&credential.id)
    .bind(&credential.auth_identity_id)
    .bind(&credential.external_credential_id)
    .bind(&credential.public_key)
    .bind(i64::from(credential.sign_counter))
    .bind(credential.device_type.as_str())
    .bind(&credential.aaguid)
    .bind(&credential.user_handle)
    .bind(credential.created_at)
    .bind(credential.last_used_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn get_by_id_postgres(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<CredentialRow>, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let row = sqlx::query_as::<_, CredentialRow>(&format!("SELECT * FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

pub(super) async fn get_by_external_id_postgres(
    conn: &mut PgConnection,
    external_credential_id: &str,
) -> Result<Option<CredentialRow>, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let row = sqlx::query_as::<_, CredentialRow>(&format!(
        "SELECT * FROM {table} WHERE external_credential_id = $1"
    ))
    .bind(external_credential_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub(super) async fn list_for_identity_postgres(
    conn: &mut PgConnection,
    auth_identity_id: &str,
) -> Result<Vec<CredentialRow>, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let rows = sqlx::query_as::<_, CredentialRow>(&format!(
        "SELECT * FROM {table} WHERE auth_identity_id = $1 ORDER BY created_at ASC"
    ))
    .bind(auth_identity_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub(super) async fn advance_counter_postgres(
    conn: &mut PgConnection,
    external_credential_id: &str,
    counter: i64,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table} SET sign_counter = $1, last_used_at = $2
        WHERE external_credential_id = $3 AND sign_counter < $4
        "#
    ))
    .bind(counter)
    .bind(now)
    .bind(external_credential_id)
    .bind(counter)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn touch_zero_counter_postgres(
    conn: &mut PgConnection,
    external_credential_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET last_used_at = $1 WHERE external_credential_id = $2 AND sign_counter = 0"
    ))
    .bind(now)
    .bind(external_credential_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_by_id_postgres(
    conn: &mut PgConnection,
    id: &str,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
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
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET auth_identity_id = $1 WHERE auth_identity_id = $2"
    ))
    .bind(to_id)
    .bind(from_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
