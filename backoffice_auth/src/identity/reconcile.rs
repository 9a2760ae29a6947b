//! Reconciliation of the authentication and business identity records.
//!
//! [`plan_reconciliation`] is a pure function from the records observed for one normalized
//! email to the list of writes that bring them to a single linked pair. Applying the writes
//! and re-planning yields an empty list.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use super::email::NormalizedEmail;
use super::errors::IdentityError;
use super::types::{AuthIdentity, BusinessIdentity, Identity, IdentitySeed, ModulePermissions};

/// Every record whose stored email normalizes to the email being reconciled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedIdentities {
    pub auth: Vec<AuthIdentity>,
    pub business: Vec<BusinessIdentity>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdentityWrite {
    /// Move credentials and registration requests of `duplicate_id` onto `canonical_id`,
    /// revoke its sessions and delete the duplicate record.
    MergeAuth {
        duplicate_id: String,
        canonical_id: String,
    },
    InsertAuth(AuthIdentity),
    UpdateAuth(AuthIdentity),
    DeleteBusiness {
        id: String,
    },
    /// Rewrite the business record's primary key in place.
    RepointBusiness {
        from_id: String,
        to_id: String,
    },
    InsertBusiness(BusinessIdentity),
    UpdateBusiness(BusinessIdentity),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub identity: Identity,
    pub writes: Vec<IdentityWrite>,
    /// Role or tenant of an existing identity changes, so its sessions must go.
    pub revoke_sessions: bool,
}

trait Record {
    fn id(&self) -> &str;
    fn email(&self) -> &str;
    fn activity_at(&self) -> DateTime<Utc>;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Record for AuthIdentity {
    fn id(&self) -> &str {
        &self.id
    }
    fn email(&self) -> &str {
        &self.email
    }
    fn activity_at(&self) -> DateTime<Utc> {
        AuthIdentity::activity_at(self)
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for BusinessIdentity {
    fn id(&self) -> &str {
        &self.id
    }
    fn email(&self) -> &str {
        &self.email
    }
    fn activity_at(&self) -> DateTime<Utc> {
        BusinessIdentity::activity_at(self)
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Canonical record order: already-normalized email, then most recent activity, then
/// oldest creation, then id.
fn canonical_order<R: Record>(email: &str, a: &R, b: &R) -> Ordering {
    (b.email() == email)
        .cmp(&(a.email() == email))
        .then_with(|| b.activity_at().cmp(&a.activity_at()))
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.id().cmp(b.id()))
}

fn pick_canonical<'a, R: Record>(email: &str, records: &'a [R]) -> Option<&'a R> {
    records.iter().min_by(|a, b| canonical_order(email, *a, *b))
}

/// The auth record reconciliation would keep for `email`.
pub(crate) fn canonical_auth<'a>(
    email: &NormalizedEmail,
    observed: &'a ObservedIdentities,
) -> Option<&'a AuthIdentity> {
    pick_canonical(email.as_str(), &observed.auth)
}

/// Compute the writes that leave exactly one linked AuthIdentity/BusinessIdentity pair for
/// `email`.
///
/// `seed` supplies role, tenant and display name when no record exists yet; without it that
/// case is `NotFound`. `new_id` is only used in that case.
pub fn plan_reconciliation(
    email: &NormalizedEmail,
    observed: &ObservedIdentities,
    seed: Option<&IdentitySeed>,
    new_id: &str,
    now: DateTime<Utc>,
) -> Result<ReconcilePlan, IdentityError> {
    let email = email.as_str();
    let auth_canon = pick_canonical(email, &observed.auth);
    let biz_canon = match auth_canon {
        Some(auth) => observed
            .business
            .iter()
            .find(|b| b.id == auth.id)
            .or_else(|| pick_canonical(email, &observed.business)),
        None => pick_canonical(email, &observed.business),
    };

    if auth_canon.is_none() && biz_canon.is_none() && seed.is_none() {
        return Err(IdentityError::NotFound(email.to_string()));
    }

    // Role and tenant follow the most recently active record; the canonical auth record
    // wins ties.
    let mut latest: Option<(DateTime<Utc>, _, _)> =
        auth_canon.map(|a| (a.activity_at(), a.role, a.tenant_id.clone()));
    let others = observed
        .auth
        .iter()
        .map(|a| (a.activity_at(), a.role, &a.tenant_id))
        .chain(
            observed
                .business
                .iter()
                .map(|b| (b.activity_at(), b.role, &b.tenant_id)),
        );
    for (at, role, tenant) in others {
        if latest.as_ref().is_none_or(|(best, _, _)| at > *best) {
            latest = Some((at, role, tenant.clone()));
        }
    }
    let (role, tenant_id) = match (latest, seed) {
        (Some((_, role, tenant)), _) => (role, tenant),
        (None, Some(seed)) => (seed.role, seed.tenant_id.clone()),
        (None, None) => return Err(IdentityError::NotFound(email.to_string())),
    };

    let id = auth_canon
        .map(|a| a.id.clone())
        .or_else(|| biz_canon.map(|b| b.id.clone()))
        .unwrap_or_else(|| new_id.to_string());

    if !role.is_admin() && tenant_id.is_none() {
        return Err(IdentityError::MissingTenant(id));
    }

    let display_name = auth_canon
        .map(|a| a.display_name.clone())
        .or_else(|| biz_canon.map(|b| b.username.clone()))
        .or_else(|| seed.map(|s| s.display_name.clone()))
        .unwrap_or_default();
    let username = biz_canon
        .map(|b| b.username.clone())
        .unwrap_or_else(|| display_name.clone());
    let module_permissions = biz_canon
        .map(|b| b.module_permissions.clone())
        .or_else(|| seed.map(|s| s.module_permissions.clone()))
        .unwrap_or_else(ModulePermissions::default);
    let auth_type = biz_canon
        .map(|b| b.auth_type.clone())
        .or_else(|| seed.map(|s| s.auth_type.clone()))
        .unwrap_or_else(|| "passkey".to_string());

    let mut identity = Identity {
        id: id.clone(),
        email: email.to_string(),
        display_name,
        username,
        role,
        tenant_id,
        module_permissions,
        is_active: biz_canon.is_none_or(|b| b.is_active),
        auth_type,
        created_at: auth_canon
            .map(|a| a.created_at)
            .or_else(|| biz_canon.map(|b| b.created_at))
            .unwrap_or(now),
        updated_at: now,
        last_login_at: auth_canon.and_then(|a| a.last_login_at),
    };

    let mut writes = Vec::new();
    let mut revoke_sessions = false;

    for dup in observed.auth.iter().filter(|a| a.id != id) {
        writes.push(IdentityWrite::MergeAuth {
            duplicate_id: dup.id.clone(),
            canonical_id: id.clone(),
        });
    }
    match auth_canon {
        Some(current) => {
            let desired = identity.auth_view();
            if !auth_matches(current, &desired) {
                revoke_sessions = current.role != desired.role
                    || current.tenant_id != desired.tenant_id;
                writes.push(IdentityWrite::UpdateAuth(AuthIdentity {
                    created_at: current.created_at,
                    ..desired
                }));
            }
        }
        None => writes.push(IdentityWrite::InsertAuth(identity.auth_view())),
    }

    let biz_canon_id = biz_canon.map(|b| b.id.as_str());
    for dup in observed
        .business
        .iter()
        .filter(|b| Some(b.id.as_str()) != biz_canon_id)
    {
        writes.push(IdentityWrite::DeleteBusiness { id: dup.id.clone() });
    }
    match biz_canon {
        Some(current) => {
            if current.id != id {
                writes.push(IdentityWrite::RepointBusiness {
                    from_id: current.id.clone(),
                    to_id: id.clone(),
                });
            }
            let desired = identity.business_view();
            if !business_matches(current, &desired) {
                writes.push(IdentityWrite::UpdateBusiness(BusinessIdentity {
                    created_at: current.created_at,
                    ..desired
                }));
            }
        }
        None => writes.push(IdentityWrite::InsertBusiness(identity.business_view())),
    }

    if writes.is_empty() {
        identity.updated_at = auth_canon
            .map(|a| a.updated_at)
            .into_iter()
            .chain(biz_canon.map(|b| b.updated_at))
            .max()
            .unwrap_or(now);
    }

    Ok(ReconcilePlan {
        identity,
        writes,
        revoke_sessions,
    })
}

fn auth_matches(current: &AuthIdentity, desired: &AuthIdentity) -> bool {
    current.email == desired.email
        && current.display_name == desired.display_name
        && current.role == desired.role
        && current.tenant_id == desired.tenant_id
}

fn business_matches(current: &BusinessIdentity, desired: &BusinessIdentity) -> bool {
    current.email == desired.email
        && current.username == desired.username
        && current.role == desired.role
        && current.tenant_id == desired.tenant_id
        && current.module_permissions == desired.module_permissions
        && current.is_active == desired.is_active
        && current.auth_type == desired.auth_type
}
