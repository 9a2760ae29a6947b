use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::identity::errors::IdentityError;
use crate::identity::types::{AuthIdentity, BusinessIdentity};
use crate::storage::{DB_TABLE_AUTH_IDENTITIES, DB_TABLE_BUSINESS_IDENTITIES, StorageError};

use super::rows::{AuthIdentityRow, BusinessIdentityRow, collect, email_key};

pub(super) async fn create_tables_postgres(conn: &mut PgConnection) -> Result<(), IdentityError> {
    let auth_table = DB_TABLE_AUTH_IDENTITIES.as_str();
    let business_table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {auth_table} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            email_norm TEXT,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL,
            tenant_id TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            last_login_at TIMESTAMPTZ
        )
        "#
    ))
    .execute(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {business_table} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            email_norm TEXT,
            username TEXT NOT NULL,
            role TEXT NOT NULL,
            tenant_id TEXT,
            module_permissions TEXT NOT NULL DEFAULT '{{}}',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            auth_type TEXT NOT NULL DEFAULT 'passkey',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    for table in [auth_table, business_table] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_email_norm ON {table}(email_norm)"
        ))
        .execute(&mut *conn)
        .await
        .map_err(StorageError::from)?;
    }

    Ok(())
}

/// Fill in the lookup key for rows written without one. Returns how many rows were keyed.
pub(super) async fn backfill_email_keys_postgres(
    conn: &mut PgConnection,
) -> Result<u64, IdentityError> {
    let mut keyed = 0;
    for table in [
        DB_TABLE_AUTH_IDENTITIES.as_str(),
        DB_TABLE_BUSINESS_IDENTITIES.as_str(),
    ] {
        let unkeyed = sqlx::query_as::<_, (String, String)>(&format!(
            "SELECT id, email FROM {table} WHERE email_norm IS NULL"
        ))
        .fetch_all(&mut *conn)
        .await
        .map_err(StorageError::from)?;

        for (id, email) in unkeyed {
            let Some(key) = email_key(&email) else {
                continue;
            };
            keyed += sqlx::query(&format!("UPDATE {table} SET email_norm = $1 WHERE id = $2"))
                .bind(key)
                .bind(&id)
                .execute(&mut *conn)
                .await
                .map_err(StorageError::from)?
                .rows_affected();
        }
    }

    Ok(keyed)
}

pub(super) async fn find_auth_by_email_postgres(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Vec<AuthIdentity>, IdentityError> {
    let table = DB_TABLE_AUTH_IDENTITIES.as_str();

    let rows = sqlx::query_as::<_, AuthIdentityRow>(&format!(
        "SELECT * FROM {table} WHERE email_norm = $1 OR email_norm IS NULL ORDER BY created_at ASC"
    ))
    .bind(email)
    .fetch_all(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    collect(rows)
}

pub(super) async fn find_business_by_email_postgres(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Vec<BusinessIdentity>, IdentityError> {
    let table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    let rows = sqlx::query_as::<_, BusinessIdentityRow>(&format!(
        "SELECT * FROM {table} WHERE email_norm = $1 OR email_norm IS NULL ORDER BY created_at ASC"
    ))
    .bind(email)
    .fetch_all(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    collect(rows)
}

pub(super) async fn get_auth_by_id_postgres(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<AuthIdentity>, IdentityError> {
    let table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query_as::<_, AuthIdentityRow>(&format!("SELECT * FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StorageError::from)?
        .map(AuthIdentity::try_from)
        .transpose()
}

pub(super) async fn get_business_by_id_postgres(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<BusinessIdentity>, IdentityError> {
    let table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    sqlx::query_as::<_, BusinessIdentityRow>(&format!("SELECT * FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StorageError::from)?
        .map(BusinessIdentity::try_from)
        .transpose()
}

pub(super) async fn insert_auth_postgres(
    conn: &mut PgConnection,
    auth: &AuthIdentity,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
            (id, email, email_norm, display_name, role, tenant_id, created_at, updated_at,
             last_login_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#
    ))
    .bind(&auth.id)
    .bind(&auth.email)
    .bind(email_key(&auth.email))
    .bind(&auth.display_name)
    .bind(auth.role.as_str())
    .bind(&auth.tenant_id)
    .bind(auth.created_at)
    .bind(auth.updated_at)
    .bind(auth.last_login_at)
    .execute(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn update_auth_postgres(
    conn: &mut PgConnection,
    auth: &AuthIdentity,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET email = $1, email_norm = $2, display_name = $3, role = $4, tenant_id = $5,
            updated_at = $6
        WHERE id = $7
        "#
    ))
    .bind(&auth.email)
    .bind(email_key(&auth.email))
    .bind(&auth.display_name)
    .bind(auth.role.as_str())
    .bind(&auth.tenant_id)
    .bind(auth.updated_at)
    .bind(&auth.id)
    .execute(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn delete_auth_postgres(
    conn: &mut PgConnection,
    id: &str,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn touch_last_login_postgres(
    conn: &mut PgConnection,
    id: &str,
    at: DateTime<Utc>,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_AUTH_IDENTITIES.as_str();

    sqlx::query(&format!("UPDATE {table} SET last_login_at = $1 WHERE id = $2"))
        .bind(at)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn insert_business_postgres(
    conn: &mut PgConnection,
    business: &BusinessIdentity,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
            (id, email, email_norm, username, role, tenant_id, module_permissions, is_active,
             auth_type, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#
    ))
    .bind(&business.id)
    .bind(&business.email)
    .bind(email_key(&business.email))
    .bind(&business.username)
    .bind(business.role.as_str())
    .bind(&business.tenant_id)
    .bind(business.module_permissions.to_json()?)
    .bind(business.is_active)
    .bind(&business.auth_type)
    .bind(business.created_at)
    .bind(business.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn update_business_postgres(
    conn: &mut PgConnection,
    business: &BusinessIdentity,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET email = $1, email_norm = $2, username = $3, role = $4, tenant_id = $5,
            module_permissions = $6, is_active = $7, auth_type = $8, updated_at = $9
        WHERE id = $10
        "#
    ))
    .bind(&business.email)
    .bind(email_key(&business.email))
    .bind(&business.username)
    .bind(business.role.as_str())
    .bind(&business.tenant_id)
    .bind(business.module_permissions.to_json()?)
    .bind(business.is_active)
    .bind(&business.auth_type)
    .bind(business.updated_at)
    .bind(&business.id)
    .execute(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn repoint_business_postgres(
    conn: &mut PgConnection,
    from_id: &str,
    to_id: &str,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    sqlx::query(&format!("UPDATE {table} SET id = $1 WHERE id = $2"))
        .bind(to_id)
        .bind(from_id)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn delete_business_postgres(
    conn: &mut PgConnection,
    id: &str,
) -> Result<(), IdentityError> {
    let table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(StorageError::from)?;

    Ok(())
}

pub(super) async fn list_emails_postgres(
    conn: &mut PgConnection,
) -> Result<(Vec<(String, String)>, Vec<(String, String)>), IdentityError> {
    let auth_table = DB_TABLE_AUTH_IDENTITIES.as_str();
    let business_table = DB_TABLE_BUSINESS_IDENTITIES.as_str();

    let auth = sqlx::query_as::<_, (String, String)>(&format!(
        "SELECT id, email FROM {auth_table} ORDER BY created_at ASC"
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    let business = sqlx::query_as::<_, (String, String)>(&format!(
        "SELECT id, email FROM {business_table} ORDER BY created_at ASC"
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    Ok((auth, business))
}
