use serde::{Deserialize, Serialize};

use super::auth_helpers::require_admin;
use super::errors::AuthError;
use crate::context::AuthContext;
use crate::identity::{NormalizedEmail, Role, find_identity_by_email};
use crate::registration::{
    ApprovedRegistration, RegistrationError, RegistrationRequest, RequestStatus,
    approve_registration, list_registration_requests, reject_registration, request_registration,
    validate_token,
};
use crate::session::SessionUser;
use crate::storage::DataConn;

/// Recorded as the approver of bootstrap requests.
const BOOTSTRAP_APPROVER: &str = "system";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequestBody {
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRegistrationBody {
    pub request_id: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Queue a registration request and return its id.
pub async fn request_registration_core(
    ctx: &AuthContext,
    body: RegistrationRequestBody,
) -> Result<String, AuthError> {
    let request = request_registration(ctx, &body.email, &body.display_name, body.tenant_id).await?;
    Ok(request.id)
}

pub async fn approve_registration_core(
    ctx: &AuthContext,
    admin: &SessionUser,
    body: ApproveRegistrationBody,
) -> Result<ApprovedRegistration, AuthError> {
    require_admin(admin, "approve_registration")?;
    Ok(approve_registration(ctx, &admin.id, &body.request_id, body.role, body.tenant_id).await?)
}

pub async fn reject_registration_core(
    ctx: &AuthContext,
    admin: &SessionUser,
    request_id: &str,
) -> Result<(), AuthError> {
    require_admin(admin, "reject_registration")?;
    Ok(reject_registration(ctx, &admin.id, request_id).await?)
}

pub async fn list_registration_requests_core(
    ctx: &AuthContext,
    admin: &SessionUser,
    status: Option<RequestStatus>,
) -> Result<Vec<RegistrationRequest>, AuthError> {
    require_admin(admin, "list_registration_requests")?;
    Ok(list_registration_requests(ctx, status).await?)
}

/// Redeem an approval token. Every rejection is [`AuthError::Unauthenticated`].
pub async fn validate_token_core(
    ctx: &AuthContext,
    request_id: &str,
    token: &str,
    email: &str,
) -> Result<String, AuthError> {
    let request = validate_token(ctx, request_id, token, email).await?;
    Ok(request.id)
}

/// Queue and approve an admin registration for `email` so a fresh deployment has someone
/// who can approve everyone else.
///
/// Returns `None` when an identity already exists for the email, or when its request was
/// approved earlier and is no longer pending.
#[tracing::instrument(skip(ctx, display_name))]
pub async fn bootstrap_admin_core(
    ctx: &AuthContext,
    email: &str,
    display_name: &str,
) -> Result<Option<ApprovedRegistration>, AuthError> {
    let normalized = NormalizedEmail::parse(email)?;
    {
        let mut conn = DataConn::acquire(ctx.data_store()).await?;
        if find_identity_by_email(&mut conn, &normalized).await?.is_some() {
            tracing::debug!("Bootstrap admin already has an identity");
            return Ok(None);
        }
    }

    let request_id = match request_registration(ctx, email, display_name, None).await {
        Ok(request) => request.id,
        Err(RegistrationError::Duplicate(_)) => {
            let pending = list_registration_requests(ctx, Some(RequestStatus::Pending)).await?;
            match pending.into_iter().find(|r| r.email == normalized.as_str()) {
                Some(request) => request.id,
                None => {
                    tracing::info!("Bootstrap admin request was already decided");
                    return Ok(None);
                }
            }
        }
        Err(e) => return Err(e.into()),
    };

    let approved =
        approve_registration(ctx, BOOTSTRAP_APPROVER, &request_id, Some(Role::Admin), None)
            .await?;
    Ok(Some(approved))
}
