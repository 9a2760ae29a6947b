use super::filter::RowFilter;
use super::types::{Decision, DenyReason, Operation, Principal, ResourceRequest};

/// One entry of the ordered policy. The first rule that reaches a verdict wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Admins are allowed everything.
    AdminBypass,
    /// Non-admins only touch resources of their own tenant.
    TenantScope,
    /// The module must be enabled with the operation's bit set.
    ModuleBit,
}

pub const POLICY: &[Rule] = &[Rule::AdminBypass, Rule::TenantScope, Rule::ModuleBit];

/// What a rule says about every row of a module, before any row is seen.
enum Constraint {
    Allow,
    Deny,
    TenantEquals(String),
    Pass,
}

impl Rule {
    fn evaluate(&self, principal: &Principal, request: &ResourceRequest) -> Option<Decision> {
        match self {
            Rule::AdminBypass => principal.role.is_admin().then_some(Decision::Allow),
            Rule::TenantScope => match (&principal.tenant_id, &request.resource_tenant_id) {
                (Some(own), Some(resource)) if own == resource => None,
                _ => Some(Decision::Deny(DenyReason::TenantMismatch)),
            },
            Rule::ModuleBit => {
                let permission = principal.module_permissions.get(&request.module);
                Some(if request.operation.permitted_by(&permission) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::PermissionDenied)
                })
            }
        }
    }

    fn constrain(&self, principal: &Principal, module: &str, operation: Operation) -> Constraint {
        match self {
            Rule::AdminBypass if principal.role.is_admin() => Constraint::Allow,
            Rule::AdminBypass => Constraint::Pass,
            Rule::TenantScope => match &principal.tenant_id {
                Some(tenant) => Constraint::TenantEquals(tenant.clone()),
                None => Constraint::Deny,
            },
            Rule::ModuleBit => {
                if operation.permitted_by(&principal.module_permissions.get(module)) {
                    Constraint::Allow
                } else {
                    Constraint::Deny
                }
            }
        }
    }
}

/// Evaluate [`POLICY`] for one concrete resource.
pub fn decide(principal: &Principal, request: &ResourceRequest) -> Decision {
    POLICY
        .iter()
        .find_map(|rule| rule.evaluate(principal, request))
        .unwrap_or(Decision::Deny(DenyReason::PermissionDenied))
}

/// Compile [`POLICY`] into the predicate selecting every row `decide` would allow.
pub fn row_filter(principal: &Principal, module: &str, operation: Operation) -> RowFilter {
    let mut filter = RowFilter::All;
    for rule in POLICY {
        match rule.constrain(principal, module, operation) {
            Constraint::Allow => return filter,
            Constraint::Deny => return RowFilter::Nothing,
            Constraint::TenantEquals(tenant) => filter = filter.and_tenant(tenant),
            Constraint::Pass => {}
        }
    }
    RowFilter::Nothing
}
