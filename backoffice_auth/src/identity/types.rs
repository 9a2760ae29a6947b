use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::errors::IdentityError;

/// Role carried by both identity records. `Admin` is the only tenant-unscoped role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Partner,
    Maintainer,
    User,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Staff,
        Role::Partner,
        Role::Maintainer,
        Role::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Partner => "partner",
            Role::Maintainer => "maintainer",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "partner" => Ok(Role::Partner),
            "maintainer" => Ok(Role::Maintainer),
            "user" => Ok(Role::User),
            other => Err(IdentityError::InvalidData(format!("Unknown role: {other}"))),
        }
    }
}

/// CRUD bits for one application module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermission {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub r: bool,
    #[serde(default)]
    pub u: bool,
    #[serde(default)]
    pub d: bool,
}

impl ModulePermission {
    pub fn full() -> Self {
        Self {
            enabled: true,
            c: true,
            r: true,
            u: true,
            d: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            enabled: true,
            r: true,
            ..Self::default()
        }
    }
}

/// Permission bits keyed by module name. A module that is not listed grants nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePermissions(BTreeMap<String, ModulePermission>);

impl ModulePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, module: impl Into<String>, permission: ModulePermission) -> Self {
        self.0.insert(module.into(), permission);
        self
    }

    pub fn get(&self, module: &str) -> ModulePermission {
        self.0.get(module).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModulePermission)> {
        self.0.iter()
    }

    pub(crate) fn to_json(&self) -> Result<String, IdentityError> {
        Ok(serde_json::to_string(self)?)
    }

    pub(crate) fn from_json(json: &str) -> Result<Self, IdentityError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}

/// Authentication-side record (`AuthView`): the source of truth for `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthIdentity {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AuthIdentity {
    /// Timestamp used to pick the winner among duplicate records.
    pub(crate) fn activity_at(&self) -> DateTime<Utc> {
        self.last_login_at
            .map_or(self.updated_at, |at| at.max(self.updated_at))
    }
}

/// Business-side record (`BusinessView`) consumed by the back-office modules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessIdentity {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub module_permissions: ModulePermissions,
    pub is_active: bool,
    pub auth_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessIdentity {
    pub(crate) fn activity_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// The canonical identity aggregate. Both persisted records are projections of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub username: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub module_permissions: ModulePermissions,
    pub is_active: bool,
    pub auth_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn auth_view(&self) -> AuthIdentity {
        AuthIdentity {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            tenant_id: self.tenant_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login_at: self.last_login_at,
        }
    }

    pub fn business_view(&self) -> BusinessIdentity {
        BusinessIdentity {
            id: self.id.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
            tenant_id: self.tenant_id.clone(),
            module_permissions: self.module_permissions.clone(),
            is_active: self.is_active,
            auth_type: self.auth_type.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild the aggregate from a linked pair of records.
    pub fn from_views(auth: AuthIdentity, business: BusinessIdentity) -> Self {
        Self {
            id: auth.id,
            email: auth.email,
            display_name: auth.display_name,
            username: business.username,
            role: auth.role,
            tenant_id: auth.tenant_id,
            module_permissions: business.module_permissions,
            is_active: business.is_active,
            auth_type: business.auth_type,
            created_at: auth.created_at,
            updated_at: auth.updated_at.max(business.updated_at),
            last_login_at: auth.last_login_at,
        }
    }
}

/// Attributes used when reconciliation has to create an identity from nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySeed {
    pub display_name: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub module_permissions: ModulePermissions,
    pub auth_type: String,
}

impl IdentitySeed {
    pub fn new(display_name: impl Into<String>, role: Role, tenant_id: Option<String>) -> Self {
        Self {
            display_name: display_name.into(),
            role,
            tenant_id,
            module_permissions: ModulePermissions::default(),
            auth_type: "passkey".to_string(),
        }
    }
}
