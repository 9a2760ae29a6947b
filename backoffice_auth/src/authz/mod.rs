//! Tenant- and module-scoped authorization from a single ordered rule table.

mod filter;
mod policy;
mod types;

pub use filter::{RowFilter, SqlDialect, SqlFilter};
pub use policy::{POLICY, Rule, decide, row_filter};
pub use types::{Decision, DenyReason, Operation, Principal, ResourceRequest};

use crate::coordination::AuthError;

/// [`decide`], with every denial written to the audit log.
pub fn authorize(principal: &Principal, request: &ResourceRequest) -> Result<(), AuthError> {
    match decide(principal, request) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::warn!(
                target: "audit",
                identity_id = %principal.identity_id,
                role = %principal.role,
                tenant_id = ?principal.tenant_id,
                module = %request.module,
                operation = %request.operation,
                resource_tenant_id = ?request.resource_tenant_id,
                ?reason,
                "Authorization denied"
            );
            Err(match reason {
                DenyReason::TenantMismatch => AuthError::TenantMismatch,
                DenyReason::PermissionDenied => AuthError::PermissionDenied,
            })
        }
    }
}
