use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::token::{TokenClaims, sign_token, verify_token};

use crate::context::AuthContext;
use crate::identity::{IdentityStore, NormalizedEmail, Role};
use crate::registration::errors::RegistrationError;
use crate::registration::storage::RegistrationStore;
use crate::registration::types::{ApprovedRegistration, RegistrationRequest, RequestStatus};
use crate::storage::{DataConn, StorageError, retry_transient};
use crate::utils::gen_random_string;

const MAX_DISPLAY_NAME_LEN: usize = 128;

fn clean_tenant(tenant_id: Option<String>) -> Option<String> {
    tenant_id
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Queue a self-service registration request as `pending`.
#[tracing::instrument(skip(ctx, display_name), fields(email = %email))]
pub(crate) async fn request_registration(
    ctx: &AuthContext,
    email: &str,
    display_name: &str,
    tenant_id: Option<String>,
) -> Result<RegistrationRequest, RegistrationError> {
    let email = NormalizedEmail::parse(email)?;
    let display_name = display_name.trim();
    if display_name.is_empty() || display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(RegistrationError::InvalidInput(
            "Display name must be 1 to 128 characters".into(),
        ));
    }

    let now = Utc::now();
    let mut conn = DataConn::acquire(ctx.data_store()).await?;

    let observed = IdentityStore::observe(&mut conn, &email).await?;
    if !observed.auth.is_empty() {
        return Err(RegistrationError::Duplicate(
            "An identity already exists for this email".into(),
        ));
    }
    if RegistrationStore::count_open_for_email(&mut conn, email.as_str(), now).await? > 0 {
        return Err(RegistrationError::Duplicate(
            "A registration request is already open for this email".into(),
        ));
    }

    let request = RegistrationRequest {
        id: Uuid::new_v4().to_string(),
        email: email.as_str().to_string(),
        display_name: display_name.to_string(),
        role: Role::User,
        tenant_id: clean_tenant(tenant_id),
        status: RequestStatus::Pending,
        token_expires_at: None,
        token_redeemed_at: None,
        consumed_at: None,
        auth_identity_id: None,
        decided_by: None,
        created_at: now,
        updated_at: now,
        token_nonce: None,
    };

    match RegistrationStore::insert(&mut conn, &request).await {
        Ok(()) => {}
        Err(StorageError::UniqueViolation(_)) => {
            return Err(RegistrationError::Duplicate(
                "A registration request is already open for this email".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        target: "audit",
        request_id = %request.id,
        email = %request.email,
        "Registration requested"
    );
    Ok(request)
}

/// `pending -> approved`, returning a signed single-use approval token.
///
/// `role` and `tenant_id` override what the requester asked for.
#[tracing::instrument(skip(ctx))]
pub(crate) async fn approve_registration(
    ctx: &AuthContext,
    decided_by: &str,
    request_id: &str,
    role: Option<Role>,
    tenant_id: Option<String>,
) -> Result<ApprovedRegistration, RegistrationError> {
    let config = &ctx.config().registration;
    let mut conn = DataConn::acquire(ctx.data_store()).await?;

    let mut request = RegistrationStore::get_by_id(&mut conn, request_id)
        .await?
        .ok_or_else(|| RegistrationError::NotFound(request_id.to_string()))?;
    if request.status != RequestStatus::Pending {
        return Err(RegistrationError::InvalidState(format!(
            "Request is {}",
            request.status
        )));
    }

    let role = role.unwrap_or(request.role);
    let tenant_id = clean_tenant(tenant_id).or(request.tenant_id.take());
    if !role.is_admin() && tenant_id.is_none() {
        return Err(RegistrationError::MissingTenant(role.to_string()));
    }

    let now = Utc::now();
    let expires_at = DateTime::from_timestamp(now.timestamp() + config.token_ttl as i64, 0)
        .ok_or_else(|| RegistrationError::Config("Token expiry out of range".into()))?;
    let nonce = gen_random_string(16)?;

    request.role = role;
    request.tenant_id = tenant_id;
    request.token_nonce = Some(nonce.clone());
    request.token_expires_at = Some(expires_at);
    request.decided_by = Some(decided_by.to_string());
    request.updated_at = now;

    if RegistrationStore::approve(&mut conn, &request).await? == 0 {
        return Err(RegistrationError::InvalidState(
            "Request is no longer pending".into(),
        ));
    }

    let approval_token = sign_token(
        &config.secret,
        &TokenClaims {
            request_id: request.id.clone(),
            expires_at: expires_at.timestamp(),
            nonce,
        },
    )?;

    tracing::info!(
        target: "audit",
        request_id = %request.id,
        decided_by,
        role = %request.role,
        tenant_id = ?request.tenant_id,
        %expires_at,
        "Registration approved"
    );

    Ok(ApprovedRegistration {
        request_id: request.id,
        approval_token,
        expires_at,
    })
}

/// Terminal rejection. Any outstanding approval token stops working.
#[tracing::instrument(skip(ctx))]
pub(crate) async fn reject_registration(
    ctx: &AuthContext,
    decided_by: &str,
    request_id: &str,
) -> Result<(), RegistrationError> {
    let mut conn = DataConn::acquire(ctx.data_store()).await?;

    if RegistrationStore::reject(&mut conn, request_id, decided_by, Utc::now()).await? == 0 {
        return match RegistrationStore::get_by_id(&mut conn, request_id).await? {
            None => Err(RegistrationError::NotFound(request_id.to_string())),
            Some(request) => Err(RegistrationError::InvalidState(format!(
                "Request is {} and cannot be rejected",
                request.status
            ))),
        };
    }

    tracing::info!(target: "audit", request_id, decided_by, "Registration rejected");
    Ok(())
}

/// Redeem an approval token. Succeeds at most once per token.
///
/// Every failure is [`RegistrationError::InvalidToken`] so callers cannot tell which check
/// failed.
#[tracing::instrument(skip(ctx, token, email))]
pub(crate) async fn validate_token(
    ctx: &AuthContext,
    request_id: &str,
    token: &str,
    email: &str,
) -> Result<RegistrationRequest, RegistrationError> {
    let claims = verify_token(&ctx.config().registration.secret, token)?;
    let now = Utc::now();

    if claims.request_id != request_id {
        tracing::debug!("Token issued for another request");
        return Err(RegistrationError::InvalidToken);
    }
    if claims.expires_at <= now.timestamp() {
        tracing::debug!(expires_at = claims.expires_at, "Token expired");
        return Err(RegistrationError::InvalidToken);
    }
    let email = NormalizedEmail::parse(email).map_err(|_| RegistrationError::InvalidToken)?;

    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    let mut request = RegistrationStore::get_by_id(&mut conn, request_id)
        .await?
        .ok_or(RegistrationError::InvalidToken)?;
    if request.email != email.as_str() {
        tracing::debug!("Token email mismatch");
        return Err(RegistrationError::InvalidToken);
    }

    if RegistrationStore::redeem_token(&mut conn, request_id, &claims.nonce, now).await? != 1 {
        tracing::warn!(request_id, "Approval token rejected: not approved, redeemed or purged");
        return Err(RegistrationError::InvalidToken);
    }

    request.token_redeemed_at = Some(now);
    tracing::info!(target: "audit", request_id, "Approval token redeemed");
    Ok(request)
}

/// The request a registration ceremony may run for: the token must match the one issued and
/// already be redeemed, and no credential may be bound yet.
pub(crate) async fn authorize_ceremony(
    ctx: &AuthContext,
    request_id: &str,
    token: &str,
) -> Result<RegistrationRequest, RegistrationError> {
    let claims = verify_token(&ctx.config().registration.secret, token)?;
    if claims.request_id != request_id {
        return Err(RegistrationError::InvalidToken);
    }

    let store = ctx.data_store();
    let request = retry_transient(|| async move {
        let mut conn = DataConn::acquire(store).await?;
        RegistrationStore::get_by_id(&mut conn, request_id)
            .await
            .map_err(|e| match e {
                RegistrationError::Storage(s) => s,
                other => StorageError::Storage(other.to_string()),
            })
    })
    .await?
    .ok_or(RegistrationError::InvalidToken)?;

    if request.token_nonce.as_deref() != Some(claims.nonce.as_str())
        || !request.is_ready_for_ceremony()
    {
        return Err(RegistrationError::InvalidToken);
    }
    Ok(request)
}

/// Mark the request consumed inside the binding transaction.
pub(crate) async fn consume_request(
    conn: &mut DataConn,
    request_id: &str,
) -> Result<(), RegistrationError> {
    if RegistrationStore::consume(conn, request_id, Utc::now()).await? != 1 {
        return Err(RegistrationError::AlreadyConsumed(request_id.to_string()));
    }
    Ok(())
}

pub(crate) async fn link_identity(
    conn: &mut DataConn,
    request_id: &str,
    auth_identity_id: &str,
) -> Result<(), RegistrationError> {
    RegistrationStore::link_identity(conn, request_id, auth_identity_id, Utc::now()).await?;
    Ok(())
}

pub(crate) async fn get_registration_request(
    ctx: &AuthContext,
    request_id: &str,
) -> Result<RegistrationRequest, RegistrationError> {
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    RegistrationStore::get_by_id(&mut conn, request_id)
        .await?
        .ok_or_else(|| RegistrationError::NotFound(request_id.to_string()))
}

pub(crate) async fn list_registration_requests(
    ctx: &AuthContext,
    status: Option<RequestStatus>,
) -> Result<Vec<RegistrationRequest>, RegistrationError> {
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    RegistrationStore::list(&mut conn, status).await
}
