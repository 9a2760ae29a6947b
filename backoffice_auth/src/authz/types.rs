use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identity::{ModulePermission, ModulePermissions, Role};
use crate::session::SessionUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// The module must be enabled and carry this operation's bit.
    pub(crate) fn permitted_by(&self, permission: &ModulePermission) -> bool {
        permission.enabled
            && match self {
                Operation::Create => permission.c,
                Operation::Read => permission.r,
                Operation::Update => permission.u,
                Operation::Delete => permission.d,
            }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "read" => Ok(Operation::Read),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(format!("Unknown operation: {other}")),
        }
    }
}

/// The caller, as resolved from a validated session.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub identity_id: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub module_permissions: ModulePermissions,
}

impl From<&SessionUser> for Principal {
    fn from(user: &SessionUser) -> Self {
        Self {
            identity_id: user.id.clone(),
            role: user.role,
            tenant_id: user.tenant_id.clone(),
            module_permissions: user.module_permissions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    pub module: String,
    pub operation: Operation,
    pub resource_tenant_id: Option<String>,
}

impl ResourceRequest {
    pub fn new(
        module: impl Into<String>,
        operation: Operation,
        resource_tenant_id: Option<String>,
    ) -> Self {
        Self {
            module: module.into(),
            operation,
            resource_tenant_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    TenantMismatch,
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}
