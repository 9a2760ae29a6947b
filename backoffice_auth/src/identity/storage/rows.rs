use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::identity::email::normalize_email;
use crate::identity::errors::IdentityError;
use crate::identity::types::{AuthIdentity, BusinessIdentity, ModulePermissions};

#[derive(Debug, FromRow)]
pub(super) struct AuthIdentityRow {
    id: String,
    email: String,
    display_name: String,
    role: String,
    tenant_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<AuthIdentityRow> for AuthIdentity {
    type Error = IdentityError;

    fn try_from(row: AuthIdentityRow) -> Result<Self, Self::Error> {
        Ok(AuthIdentity {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            role: row.role.parse()?,
            tenant_id: row.tenant_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct BusinessIdentityRow {
    id: String,
    email: String,
    username: String,
    role: String,
    tenant_id: Option<String>,
    module_permissions: String,
    is_active: bool,
    auth_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BusinessIdentityRow> for BusinessIdentity {
    type Error = IdentityError;

    fn try_from(row: BusinessIdentityRow) -> Result<Self, Self::Error> {
        Ok(BusinessIdentity {
            id: row.id,
            email: row.email,
            username: row.username,
            role: row.role.parse()?,
            tenant_id: row.tenant_id,
            module_permissions: ModulePermissions::from_json(&row.module_permissions)?,
            is_active: row.is_active,
            auth_type: row.auth_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, IdentityError>
where
    T: TryFrom<R, Error = IdentityError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Lookup key stored beside `email`. Malformed addresses get no key.
pub(super) fn email_key(email: &str) -> Option<String> {
    normalize_email(email).ok()
}
