use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::PasskeyCredential;
use crate::storage::{DB_TABLE_AUTH_IDENTITIES, DB_TABLE_CREDENTIALS, StorageError};

#[derive(Debug, FromRow)]
pub(super) struct CredentialRow {
    id: String,
    auth_identity_id: String,
    external_credential_id: String,
    public_key: String,
    sign_counter: i64,
    device_type: String,
    aaguid: String,
    user_handle: String,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl TryFrom<CredentialRow> for PasskeyCredential {
    type Error = PasskeyError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(PasskeyCredential {
            id: row.id,
            auth_identity_id: row.auth_identity_id,
            external_credential_id: row.external_credential_id,
            public_key: row.public_key,
            sign_counter: u32::try_from(row.sign_counter)
                .map_err(|_| PasskeyError::Format("Stored sign counter out of range".into()))?,
            device_type: row.device_type.parse()?,
            aaguid: row.aaguid,
            user_handle: row.user_handle,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        })
    }
}

pub(super) fn collect(rows: Vec<CredentialRow>) -> Result<Vec<PasskeyCredential>, PasskeyError> {
    rows.into_iter().map(PasskeyCredential::try_from).collect()
}

pub(super) async fn create_tables_sqlite(conn: &mut SqliteConnection) -> Result<(), StorageError> {
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
            created_at TIMESTAMP NOT NULL,
            last_used_at TIMESTAMP
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

pub(super) async fn insert_credential_sqlite(
    conn: &mut SqliteConnection,
    credential: &PasskeyCredential,
) -> Result<(), StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
            (id, auth_identity_id, external_credential_id, public_key, sign_counter,
             device_type, aaguid, user_handle, created_at, last_used_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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

pub(super) async fn get_by_id_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<CredentialRow>, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let row = sqlx::query_as::<_, CredentialRow>(&format!("SELECT * FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

pub(super) async fn get_by_external_id_sqlite(
    conn: &mut SqliteConnection,
    external_credential_id: &str,
) -> Result<Option<CredentialRow>, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let row = sqlx::query_as::<_, CredentialRow>(&format!(
        "SELECT * FROM {table} WHERE external_credential_id = ?"
    ))
    .bind(external_credential_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub(super) async fn list_for_identity_sqlite(
    conn: &mut SqliteConnection,
    auth_identity_id: &str,
) -> Result<Vec<CredentialRow>, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let rows = sqlx::query_as::<_, CredentialRow>(&format!(
        "SELECT * FROM {table} WHERE auth_identity_id = ? ORDER BY created_at ASC"
    ))
    .bind(auth_identity_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub(super) async fn advance_counter_sqlite(
    conn: &mut SqliteConnection,
    external_credential_id: &str,
    counter: i64,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table} SET sign_counter = ?, last_used_at = ?
        WHERE external_credential_id = ? AND sign_counter < ?
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

pub(super) async fn touch_zero_counter_sqlite(
    conn: &mut SqliteConnection,
    external_credential_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET last_used_at = ? WHERE external_credential_id = ? AND sign_counter = 0"
    ))
    .bind(now)
    .bind(external_credential_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_by_id_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<u64, StorageError> {
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
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
    let table = DB_TABLE_CREDENTIALS.as_str();

    let result = sqlx::query(&format!(
        "UPDATE {table} SET auth_identity_id = ? WHERE auth_identity_id = ?"
    ))
    .bind(to_id)
    .bind(from_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
