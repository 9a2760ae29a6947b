use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::context::AuthContext;
use crate::identity::{
    IdentityError, IdentitySeed, IdentityStore, NormalizedEmail, load_identity, reconcile_in,
};
use crate::passkey::{
    AuthenticationOptions, AuthenticatorResponse, PasskeyCredential, PasskeyError, PasskeyStore,
    RegisterCredential, RegistrationOptions, VerifiedRegistration, finish_authentication,
    start_authentication, start_registration, verify_registration,
};
use crate::registration::{
    RegistrationError, authorize_ceremony, consume_request, get_registration_request,
    link_identity,
};
use crate::session::{IssuedSession, SessionStore, SessionUser, issue_session};
use crate::storage::{DataConn, DataStore, StorageError};

use super::auth_helpers::require_owner_or_admin;
use super::errors::AuthError;

const MAX_BIND_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStartRequest {
    pub request_id: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFinishRequest {
    pub request_id: String,
    pub credential: RegisterCredential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationStartRequest {
    pub email: String,
    #[serde(default)]
    pub platform_authenticator_available: Option<bool>,
}

/// Creation options for a request whose approval token has been redeemed.
pub async fn handle_start_registration_core(
    ctx: &AuthContext,
    body: RegistrationStartRequest,
) -> Result<RegistrationOptions, AuthError> {
    let request = authorize_ceremony(ctx, &body.request_id, &body.token).await?;
    Ok(start_registration(ctx, &request.id, &request.email, &request.display_name).await?)
}

/// Verify the attestation, then bind the credential to a reconciled identity and issue a
/// session.
///
/// Consuming the request, reconciling the identity and storing the credential happen in one
/// transaction. A unique-key collision rolls everything back and the binding is retried from
/// a fresh read.
#[tracing::instrument(skip(ctx, body), fields(request_id = %body.request_id))]
pub async fn handle_finish_registration_core(
    ctx: &AuthContext,
    body: RegistrationFinishRequest,
) -> Result<(SessionUser, IssuedSession), AuthError> {
    let verified = verify_registration(ctx, &body.request_id, &body.credential).await?;
    let request = get_registration_request(ctx, &verified.request_id).await?;
    let email = NormalizedEmail::parse(&verified.email)?;
    let seed = IdentitySeed::new(request.display_name, request.role, request.tenant_id);

    let mut identity = None;
    for attempt in 1..=MAX_BIND_ATTEMPTS {
        match bind_credential(ctx.data_store(), &email, &seed, &verified).await {
            Ok(bound) => {
                identity = Some(bound);
                break;
            }
            Err(BindError::Collision(msg)) => {
                tracing::warn!(attempt, %msg, "Credential binding collided, retrying");
            }
            Err(BindError::Failed(e)) => return Err(e),
        }
    }
    let Some(mut identity) = identity else {
        return Err(AuthError::Conflict(format!(
            "Could not bind credential for {email} after {MAX_BIND_ATTEMPTS} attempts"
        ))
        .log());
    };

    tracing::info!(
        target: "audit",
        request_id = %verified.request_id,
        identity_id = %identity.id,
        credential_id = %verified.external_credential_id,
        "Passkey registered"
    );

    if !identity.is_active {
        tracing::warn!(target: "audit", identity_id = %identity.id, "Registration bound to a deactivated identity; no session issued");
        return Err(AuthError::Unauthenticated);
    }

    let now = Utc::now();
    {
        let mut conn = DataConn::acquire(ctx.data_store()).await?;
        IdentityStore::touch_last_login(&mut conn, &identity.id, now).await?;
    }
    identity.last_login_at = Some(now);

    let issued = issue_session(ctx, &identity.id).await?;
    Ok((SessionUser::new(identity, issued.expires_at), issued))
}

/// Outcome of one binding attempt that did not succeed.
enum BindError {
    /// A concurrent writer won a unique-key race
    Collision(String),
    Failed(AuthError),
}

impl From<StorageError> for BindError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UniqueViolation(msg) => Self::Collision(msg),
            other => Self::Failed(other.into()),
        }
    }
}

impl From<IdentityError> for BindError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Storage(e) => e.into(),
            other => Self::Failed(other.into()),
        }
    }
}

impl From<PasskeyError> for BindError {
    fn from(err: PasskeyError) -> Self {
        match err {
            PasskeyError::Storage(e) => e.into(),
            other => Self::Failed(other.into()),
        }
    }
}

impl From<RegistrationError> for BindError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Storage(e) => e.into(),
            RegistrationError::Identity(e) => e.into(),
            other => Self::Failed(other.into()),
        }
    }
}

async fn bind_credential(
    store: &dyn DataStore,
    email: &NormalizedEmail,
    seed: &IdentitySeed,
    verified: &VerifiedRegistration,
) -> Result<crate::identity::Identity, BindError> {
    let mut tx = DataConn::begin(store).await?;
    match bind_in(&mut tx, email, seed, verified).await {
        Ok(identity) => {
            tx.commit().await?;
            Ok(identity)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn bind_in(
    tx: &mut DataConn,
    email: &NormalizedEmail,
    seed: &IdentitySeed,
    verified: &VerifiedRegistration,
) -> Result<crate::identity::Identity, BindError> {
    consume_request(tx, &verified.request_id).await?;
    let outcome = reconcile_in(tx, email, Some(seed)).await?;
    if PasskeyStore::get_by_external_id(tx, &verified.external_credential_id)
        .await?
        .is_some()
    {
        return Err(BindError::Failed(
            AuthError::Conflict(format!(
                "Credential {} is already registered",
                verified.external_credential_id
            ))
            .log(),
        ));
    }
    let credential = verified.clone().into_credential(&outcome.identity.id);
    PasskeyStore::insert(tx, &credential).await?;
    link_identity(tx, &verified.request_id, &outcome.identity.id).await?;
    Ok(outcome.identity)
}

pub async fn handle_start_authentication_core(
    ctx: &AuthContext,
    body: AuthenticationStartRequest,
    request_origin: Option<&str>,
) -> Result<AuthenticationOptions, AuthError> {
    Ok(start_authentication(
        ctx,
        &body.email,
        request_origin,
        body.platform_authenticator_available,
    )
    .await?)
}

/// Verify an assertion and issue a session for the credential's owner.
#[tracing::instrument(skip(ctx, response))]
pub async fn handle_finish_authentication_core(
    ctx: &AuthContext,
    response: &AuthenticatorResponse,
) -> Result<(SessionUser, IssuedSession), AuthError> {
    let credential = finish_authentication(ctx, response).await?;

    let now = Utc::now();
    let mut identity = {
        let mut conn = DataConn::acquire(ctx.data_store()).await?;
        let identity = load_identity(&mut conn, &credential.auth_identity_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        if !identity.is_active {
            tracing::warn!(target: "audit", identity_id = %identity.id, "Login by deactivated identity refused");
            return Err(AuthError::Unauthenticated);
        }
        IdentityStore::touch_last_login(&mut conn, &identity.id, now).await?;
        identity
    };
    identity.last_login_at = Some(now);

    let issued = issue_session(ctx, &identity.id).await?;
    tracing::info!(
        target: "audit",
        identity_id = %identity.id,
        credential_id = %credential.external_credential_id,
        sign_counter = credential.sign_counter,
        "Passkey login"
    );
    Ok((SessionUser::new(identity, issued.expires_at), issued))
}

pub async fn list_credentials_core(
    ctx: &AuthContext,
    user: &SessionUser,
) -> Result<Vec<PasskeyCredential>, AuthError> {
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    Ok(PasskeyStore::list_for_identity(&mut conn, &user.id).await?)
}

/// Delete a credential owned by the caller, or any credential when the caller is an admin.
/// Every session of the credential's owner ends with it.
#[tracing::instrument(skip(ctx, user), fields(user_id = %user.id))]
pub async fn delete_passkey_credential_core(
    ctx: &AuthContext,
    user: &SessionUser,
    credential_id: &str,
) -> Result<(), AuthError> {
    let mut tx = DataConn::begin(ctx.data_store()).await?;
    let result = delete_credential_in(&mut tx, user, credential_id).await;
    match result {
        Ok(()) => tx.commit().await?,
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            return Err(e);
        }
    }
    Ok(())
}

async fn delete_credential_in(
    tx: &mut DataConn,
    user: &SessionUser,
    credential_id: &str,
) -> Result<(), AuthError> {
    let credential = PasskeyStore::get_by_id(tx, credential_id)
        .await?
        .ok_or_else(|| AuthError::NotFound(format!("Passkey {credential_id}")).log())?;
    require_owner_or_admin(user, &credential.auth_identity_id, "delete_passkey_credential")?;

    PasskeyStore::delete(tx, &credential.id).await?;
    let revoked = SessionStore::delete_for_identity(tx, &credential.auth_identity_id).await?;

    tracing::info!(
        target: "audit",
        actor = %user.id,
        owner = %credential.auth_identity_id,
        credential_id = %credential.external_credential_id,
        revoked,
        "Passkey deleted"
    );
    Ok(())
}
