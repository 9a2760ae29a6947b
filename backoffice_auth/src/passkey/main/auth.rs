use chrono::Utc;
use ring::signature::{ECDSA_P256_SHA256_ASN1, UnparsedPublicKey};

use super::challenge::{AUTHENTICATION_CHALLENGE, store_challenge, take_challenge};
use super::types::{
    AllowCredential, AuthenticationOptions, AuthenticatorData, AuthenticatorResponse,
    ParsedClientData,
};

use crate::context::AuthContext;
use crate::identity::{NormalizedEmail, find_identity_by_email};
use crate::passkey::errors::PasskeyError;
use crate::passkey::storage::PasskeyStore;
use crate::passkey::types::{PasskeyCredential, StoredChallenge};
use crate::storage::DataConn;
use crate::utils::{base64url_decode, gen_random_string};

/// Issue request options for the identity registered under `email`.
///
/// `request_origin` is the `Origin` header of the starting request, when the caller has one.
/// `platform_available` is the client's report of whether a platform authenticator exists.
#[tracing::instrument(skip(ctx), fields(email = %email))]
pub(crate) async fn start_authentication(
    ctx: &AuthContext,
    email: &str,
    request_origin: Option<&str>,
    platform_available: Option<bool>,
) -> Result<AuthenticationOptions, PasskeyError> {
    let config = &ctx.config().passkey;

    if let Some(origin) = request_origin {
        if origin.trim_end_matches('/') != config.origin {
            return Err(PasskeyError::InvalidRequest(format!(
                "Unexpected origin: {origin}"
            )));
        }
    }

    if config.platform_only() && platform_available == Some(false) {
        return Err(PasskeyError::InvalidRequest(
            "A platform authenticator is required".to_string(),
        ));
    }

    let email = NormalizedEmail::parse(email)?;
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    let identity = find_identity_by_email(&mut conn, &email)
        .await?
        .ok_or_else(|| PasskeyError::NotFound("No identity for email".to_string()))?;
    let credentials = PasskeyStore::list_for_identity(&mut conn, &identity.id).await?;
    drop(conn);

    if credentials.is_empty() {
        return Err(PasskeyError::NotFound(
            "No credentials registered".to_string(),
        ));
    }

    let challenge = gen_random_string(32)?;
    let auth_id = gen_random_string(16)?;
    let allow_credentials: Vec<String> = credentials
        .into_iter()
        .map(|c| c.external_credential_id)
        .collect();

    let stored = StoredChallenge {
        challenge: challenge.clone(),
        request_id: None,
        email: Some(email.as_str().to_string()),
        user_handle: None,
        auth_identity_id: Some(identity.id.clone()),
        allow_credentials: allow_credentials.clone(),
        issued_at: Utc::now().timestamp(),
    };
    store_challenge(ctx, AUTHENTICATION_CHALLENGE, &auth_id, &stored).await?;

    tracing::debug!(identity_id = %identity.id, credentials = allow_credentials.len(), "Authentication options issued");

    Ok(AuthenticationOptions {
        challenge,
        timeout: config.timeout * 1000, // milliseconds
        rp_id: config.rp_id.clone(),
        allow_credentials: allow_credentials
            .into_iter()
            .map(|id| AllowCredential {
                type_: "public-key".to_string(),
                id,
            })
            .collect(),
        user_verification: config.user_verification.clone(),
        auth_id,
    })
}

/// Verify an assertion and advance the credential's signature counter.
///
/// Returns the credential with the counter it now has in storage.
#[tracing::instrument(skip(ctx, response), fields(credential_id = %response.raw_id))]
pub(crate) async fn finish_authentication(
    ctx: &AuthContext,
    response: &AuthenticatorResponse,
) -> Result<PasskeyCredential, PasskeyError> {
    let config = &ctx.config().passkey;
    let stored = take_challenge(ctx, AUTHENTICATION_CHALLENGE, &response.auth_id).await?;

    if response.id != response.raw_id {
        return Err(PasskeyError::Format("Credential id and rawId differ".into()));
    }

    let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;
    client_data.verify("webauthn.get", &stored.challenge, config)?;

    let auth_data = AuthenticatorData::from_base64(&response.response.authenticator_data)?;
    auth_data.verify(config)?;

    if !stored.allow_credentials.contains(&response.raw_id) {
        return Err(PasskeyError::Verification(
            "Credential was not offered for this challenge".into(),
        ));
    }

    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    let mut credential = PasskeyStore::get_by_external_id(&mut conn, &response.raw_id)
        .await?
        .ok_or_else(|| PasskeyError::NotFound("Credential not found".into()))?;

    if stored.auth_identity_id.as_deref() != Some(credential.auth_identity_id.as_str()) {
        tracing::warn!(identity_id = %credential.auth_identity_id, "Credential owner changed since challenge");
        return Err(PasskeyError::Verification(
            "Credential does not belong to the challenged identity".into(),
        ));
    }

    if let Some(handle) = response.response.user_handle.as_deref() {
        if handle != credential.user_handle {
            return Err(PasskeyError::Verification(
                "User handle mismatch. For more details, run with RUST_LOG=debug".into(),
            ));
        }
    }

    verify_signature(response, &client_data, &auth_data, &credential)?;

    let now = Utc::now();
    let received = auth_data.counter;
    let updated = if config.allow_zero_counter && received == 0 && credential.sign_counter == 0 {
        PasskeyStore::touch_zero_counter(&mut conn, &credential.external_credential_id, now)
            .await?
    } else {
        PasskeyStore::advance_counter(&mut conn, &credential.external_credential_id, received, now)
            .await?
    };

    if updated == 0 {
        tracing::warn!(
            target: "audit",
            credential_id = %credential.external_credential_id,
            identity_id = %credential.auth_identity_id,
            stored = credential.sign_counter,
            received,
            "Signature counter did not advance; possible cloned authenticator"
        );
        return Err(PasskeyError::ReplayDetected(
            credential.external_credential_id,
        ));
    }

    credential.sign_counter = received;
    credential.last_used_at = Some(now);

    tracing::debug!(counter = received, "Assertion verified");
    Ok(credential)
}

fn verify_signature(
    response: &AuthenticatorResponse,
    client_data: &ParsedClientData,
    auth_data: &AuthenticatorData,
    credential: &PasskeyCredential,
) -> Result<(), PasskeyError> {
    let public_key = base64url_decode(&credential.public_key)
        .map_err(|e| PasskeyError::Format(format!("Invalid stored public key: {e}")))?;
    let signature = base64url_decode(&response.response.signature)
        .map_err(|e| PasskeyError::Format(format!("Invalid signature encoding: {e}")))?;

    let mut signed_data = auth_data.raw_data.clone();
    signed_data.extend_from_slice(&client_data.hash());

    UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, &public_key)
        .verify(&signed_data, &signature)
        .map_err(|_| {
            PasskeyError::Verification(
                "Signature verification failed. For more details, run with RUST_LOG=debug".into(),
            )
        })
}
