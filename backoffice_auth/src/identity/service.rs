use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::passkey::PasskeyStore;
use crate::registration::RegistrationStore;
use crate::session::SessionStore;
use crate::storage::{DataConn, DataStore, StorageError};

use super::email::{NormalizedEmail, normalize_email};
use super::errors::IdentityError;
use super::reconcile::{IdentityWrite, canonical_auth, plan_reconciliation};
use super::storage::IdentityStore;
use super::types::{Identity, IdentitySeed, ModulePermissions, Role};

pub(crate) const MAX_RECONCILE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub identity: Identity,
    pub writes: usize,
}

/// A stored record whose email does not normalize. These are left for an operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedIdentity {
    pub id: String,
    pub email: String,
    pub record: &'static str,
}

/// Observe, plan and apply on `conn`. The caller owns the transaction.
#[tracing::instrument(skip(conn, seed), fields(email = %email))]
pub(crate) async fn reconcile_in(
    conn: &mut DataConn,
    email: &NormalizedEmail,
    seed: Option<&IdentitySeed>,
) -> Result<ReconcileOutcome, IdentityError> {
    let observed = IdentityStore::observe(conn, email).await?;
    let new_id = Uuid::new_v4().to_string();
    let plan = plan_reconciliation(email, &observed, seed, &new_id, Utc::now())?;

    apply_writes(conn, &plan.writes).await?;
    if plan.revoke_sessions {
        let revoked = SessionStore::delete_for_identity(conn, &plan.identity.id).await?;
        tracing::info!(
            target: "audit",
            identity_id = %plan.identity.id,
            revoked,
            "Role or tenant changed during reconciliation; sessions revoked"
        );
    }

    if !plan.writes.is_empty() {
        tracing::info!(
            identity_id = %plan.identity.id,
            writes = plan.writes.len(),
            "Identity reconciled"
        );
    }

    Ok(ReconcileOutcome {
        identity: plan.identity,
        writes: plan.writes.len(),
    })
}

pub(crate) async fn apply_writes(
    conn: &mut DataConn,
    writes: &[IdentityWrite],
) -> Result<(), IdentityError> {
    for write in writes {
        match write {
            IdentityWrite::MergeAuth {
                duplicate_id,
                canonical_id,
            } => {
                PasskeyStore::reassign_identity(conn, duplicate_id, canonical_id).await?;
                RegistrationStore::reassign_identity(conn, duplicate_id, canonical_id).await?;
                SessionStore::delete_for_identity(conn, duplicate_id).await?;
                IdentityStore::delete_auth(conn, duplicate_id).await?;
                tracing::info!(
                    target: "audit",
                    duplicate_id = %duplicate_id,
                    canonical_id = %canonical_id,
                    "Merged duplicate auth identity"
                );
            }
            IdentityWrite::InsertAuth(auth) => IdentityStore::insert_auth(conn, auth).await?,
            IdentityWrite::UpdateAuth(auth) => IdentityStore::update_auth(conn, auth).await?,
            IdentityWrite::DeleteBusiness { id } => {
                IdentityStore::delete_business(conn, id).await?;
                tracing::info!(target: "audit", business_id = %id, "Removed duplicate business identity");
            }
            IdentityWrite::RepointBusiness { from_id, to_id } => {
                IdentityStore::repoint_business(conn, from_id, to_id).await?;
                tracing::info!(
                    target: "audit",
                    from_id = %from_id,
                    to_id = %to_id,
                    "Re-pointed business identity to its auth identity"
                );
            }
            IdentityWrite::InsertBusiness(business) => {
                IdentityStore::insert_business(conn, business).await?
            }
            IdentityWrite::UpdateBusiness(business) => {
                IdentityStore::update_business(conn, business).await?
            }
        }
    }
    Ok(())
}

/// Ensure exactly one linked identity pair exists for `email`, retrying from a fresh read
/// when a concurrent writer wins a unique-key race.
pub(crate) async fn ensure_identity(
    store: &dyn DataStore,
    email: &str,
    seed: Option<&IdentitySeed>,
) -> Result<ReconcileOutcome, IdentityError> {
    let email = NormalizedEmail::parse(email)?;

    for attempt in 1..=MAX_RECONCILE_ATTEMPTS {
        let mut tx = DataConn::begin(store).await?;
        let result = match reconcile_in(&mut tx, &email, seed).await {
            Ok(outcome) => tx.commit().await.map(|_| outcome).map_err(IdentityError::from),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        };

        match result {
            Err(IdentityError::Storage(StorageError::UniqueViolation(msg))) => {
                tracing::warn!(attempt, email = %email, %msg, "Reconciliation collided, re-reading");
            }
            other => return other,
        }
    }

    Err(IdentityError::Conflict(format!(
        "Could not reconcile {email} after {MAX_RECONCILE_ATTEMPTS} attempts"
    )))
}

/// Load the aggregate for an auth identity id. A missing business record yields the
/// defaults a freshly reconciled identity would get.
pub(crate) async fn load_identity(
    conn: &mut DataConn,
    id: &str,
) -> Result<Option<Identity>, IdentityError> {
    let Some(auth) = IdentityStore::get_auth_by_id(conn, id).await? else {
        return Ok(None);
    };
    let identity = match IdentityStore::get_business_by_id(conn, id).await? {
        Some(business) => Identity::from_views(auth, business),
        None => Identity {
            id: auth.id,
            email: auth.email,
            username: auth.display_name.clone(),
            display_name: auth.display_name,
            role: auth.role,
            tenant_id: auth.tenant_id,
            module_permissions: ModulePermissions::default(),
            is_active: true,
            auth_type: "passkey".to_string(),
            created_at: auth.created_at,
            updated_at: auth.updated_at,
            last_login_at: auth.last_login_at,
        },
    };
    Ok(Some(identity))
}

/// The identity an email currently resolves to, without writing anything.
pub(crate) async fn find_identity_by_email(
    conn: &mut DataConn,
    email: &NormalizedEmail,
) -> Result<Option<Identity>, IdentityError> {
    let observed = IdentityStore::observe(conn, email).await?;
    match canonical_auth(email, &observed) {
        Some(auth) => load_identity(conn, &auth.id).await,
        None => Ok(None),
    }
}

/// Set role, tenant and optionally module permissions on both records and revoke the
/// identity's sessions.
pub(crate) async fn change_role(
    conn: &mut DataConn,
    id: &str,
    role: Role,
    tenant_id: Option<String>,
    module_permissions: Option<ModulePermissions>,
) -> Result<Identity, IdentityError> {
    if !role.is_admin() && tenant_id.is_none() {
        return Err(IdentityError::MissingTenant(id.to_string()));
    }

    let mut identity = load_identity(conn, id)
        .await?
        .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
    let has_business = IdentityStore::get_business_by_id(conn, id).await?.is_some();

    identity.role = role;
    identity.tenant_id = tenant_id;
    if let Some(perms) = module_permissions {
        identity.module_permissions = perms;
    }
    identity.updated_at = Utc::now();

    let business = identity.business_view();
    let writes = [
        IdentityWrite::UpdateAuth(identity.auth_view()),
        if has_business {
            IdentityWrite::UpdateBusiness(business)
        } else {
            IdentityWrite::InsertBusiness(business)
        },
    ];
    apply_writes(conn, &writes).await?;

    let revoked = SessionStore::delete_for_identity(conn, id).await?;
    tracing::info!(
        target: "audit",
        identity_id = %id,
        role = %identity.role,
        tenant_id = ?identity.tenant_id,
        revoked,
        "Role changed; sessions revoked"
    );

    Ok(identity)
}

/// Operator fix for a record stored under a malformed email: rewrite the email on the
/// records with `id`, then reconcile under the corrected address.
pub(crate) async fn correct_email(
    conn: &mut DataConn,
    id: &str,
    new_email: &str,
) -> Result<ReconcileOutcome, IdentityError> {
    let email = NormalizedEmail::parse(new_email)?;
    let now = Utc::now();

    let auth = IdentityStore::get_auth_by_id(conn, id).await?;
    let business = IdentityStore::get_business_by_id(conn, id).await?;
    if auth.is_none() && business.is_none() {
        return Err(IdentityError::NotFound(id.to_string()));
    }

    if let Some(mut auth) = auth {
        tracing::info!(target: "audit", identity_id = %id, old = %auth.email, new = %email, "Correcting auth identity email");
        auth.email = email.to_string();
        auth.updated_at = now;
        IdentityStore::update_auth(conn, &auth).await?;
    }
    if let Some(mut business) = business {
        tracing::info!(target: "audit", identity_id = %id, old = %business.email, new = %email, "Correcting business identity email");
        business.email = email.to_string();
        business.updated_at = now;
        IdentityStore::update_business(conn, &business).await?;
    }

    reconcile_in(conn, &email, None).await
}

pub(crate) async fn list_malformed(
    conn: &mut DataConn,
) -> Result<Vec<MalformedIdentity>, IdentityError> {
    let (auth, business) = IdentityStore::list_emails(conn).await?;

    let malformed = auth
        .into_iter()
        .map(|r| (r, "auth"))
        .chain(business.into_iter().map(|r| (r, "business")))
        .filter(|(r, _)| normalize_email(&r.email).is_err())
        .map(|(r, record)| MalformedIdentity {
            id: r.id,
            email: r.email,
            record,
        })
        .collect();

    Ok(malformed)
}
