use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::Serialize;
use sqlx::FromRow;

use crate::identity::{Identity, ModulePermissions, Role};

/// The authenticated identity behind a valid session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub username: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub module_permissions: ModulePermissions,
    pub expires_at: DateTime<Utc>,
}

impl SessionUser {
    pub(crate) fn new(identity: Identity, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: identity.id,
            email: identity.email,
            display_name: identity.display_name,
            username: identity.username,
            role: identity.role,
            tenant_id: identity.tenant_id,
            module_permissions: identity.module_permissions,
            expires_at,
        }
    }
}

/// A freshly issued session. The raw token only ever exists here and in the cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// `Set-Cookie` carrying the token
    pub headers: HeaderMap,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct StoredSession {
    pub(crate) id: String,
    pub(crate) auth_identity_id: String,
    pub(crate) token_hash: String,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) created_at: DateTime<Utc>,
}
