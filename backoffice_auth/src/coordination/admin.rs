//! Operator actions. Every function checks that the caller is an admin before touching
//! storage.

use serde::{Deserialize, Serialize};

use crate::context::AuthContext;
use crate::identity::{
    Identity, MalformedIdentity, ModulePermissions, ReconcileOutcome, Role, change_role,
    correct_email, ensure_identity, list_malformed,
};
use crate::session::SessionUser;
use crate::storage::DataConn;

use super::auth_helpers::require_admin;
use super::errors::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeRequest {
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub module_permissions: Option<ModulePermissions>,
}

/// Change role, tenant and optionally module permissions. The identity's sessions are
/// revoked in the same transaction.
#[tracing::instrument(skip(ctx, admin, body), fields(admin_id = %admin.id))]
pub async fn change_role_core(
    ctx: &AuthContext,
    admin: &SessionUser,
    identity_id: &str,
    body: RoleChangeRequest,
) -> Result<Identity, AuthError> {
    require_admin(admin, "change_role")?;

    let mut tx = DataConn::begin(ctx.data_store()).await?;
    match change_role(
        &mut tx,
        identity_id,
        body.role,
        body.tenant_id,
        body.module_permissions,
    )
    .await
    {
        Ok(identity) => {
            tx.commit().await?;
            Ok(identity)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(e.into())
        }
    }
}

pub async fn reconcile_email_core(
    ctx: &AuthContext,
    admin: &SessionUser,
    email: &str,
) -> Result<ReconcileOutcome, AuthError> {
    require_admin(admin, "reconcile_email")?;
    let outcome = ensure_identity(ctx.data_store(), email, None).await?;
    tracing::info!(
        target: "audit",
        admin_id = %admin.id,
        identity_id = %outcome.identity.id,
        writes = outcome.writes,
        "Identity reconciled on request"
    );
    Ok(outcome)
}

pub async fn list_malformed_identities_core(
    ctx: &AuthContext,
    admin: &SessionUser,
) -> Result<Vec<MalformedIdentity>, AuthError> {
    require_admin(admin, "list_malformed_identities")?;
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    Ok(list_malformed(&mut conn).await?)
}

/// Rewrite a malformed email and reconcile the record under the corrected address.
#[tracing::instrument(skip(ctx, admin), fields(admin_id = %admin.id))]
pub async fn correct_identity_email_core(
    ctx: &AuthContext,
    admin: &SessionUser,
    identity_id: &str,
    email: &str,
) -> Result<Identity, AuthError> {
    require_admin(admin, "correct_identity_email")?;

    let mut tx = DataConn::begin(ctx.data_store()).await?;
    match correct_email(&mut tx, identity_id, email).await {
        Ok(outcome) => {
            tx.commit().await?;
            Ok(outcome.identity)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(e.into())
        }
    }
}
