use chrono::Utc;
use uuid::Uuid;

use super::attestation::verify_attestation;
use super::challenge::{REGISTRATION_CHALLENGE, store_challenge, take_challenge};
use super::types::{
    AttestationObject, AuthenticatorData, AuthenticatorSelection, ParsedClientData,
    PubKeyCredParam, PublicKeyCredentialUserEntity, RegisterCredential, RegistrationOptions,
    RelyingParty,
};

use crate::context::AuthContext;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{DeviceType, PasskeyCredential, StoredChallenge};
use crate::utils::{base64url_decode, base64url_encode, gen_random_string};

const ES256_ALG: i32 = -7;

/// A verified attestation, not yet bound to an identity.
#[derive(Debug, Clone)]
pub(crate) struct VerifiedRegistration {
    pub(crate) request_id: String,
    pub(crate) email: String,
    pub(crate) external_credential_id: String,
    pub(crate) public_key: String,
    pub(crate) sign_counter: u32,
    pub(crate) device_type: DeviceType,
    pub(crate) aaguid: String,
    pub(crate) user_handle: String,
}

impl VerifiedRegistration {
    pub(crate) fn into_credential(self, auth_identity_id: &str) -> PasskeyCredential {
        PasskeyCredential {
            id: Uuid::new_v4().to_string(),
            auth_identity_id: auth_identity_id.to_string(),
            external_credential_id: self.external_credential_id,
            public_key: self.public_key,
            sign_counter: self.sign_counter,
            device_type: self.device_type,
            aaguid: self.aaguid,
            user_handle: self.user_handle,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

/// Issue creation options for an approved registration request.
///
/// The challenge is keyed by the request id, so one request has at most one live ceremony.
#[tracing::instrument(skip(ctx, display_name))]
pub(crate) async fn start_registration(
    ctx: &AuthContext,
    request_id: &str,
    email: &str,
    display_name: &str,
) -> Result<RegistrationOptions, PasskeyError> {
    let config = &ctx.config().passkey;
    let challenge = gen_random_string(32)?;
    let user_handle = gen_random_string(16)?;

    let stored = StoredChallenge {
        challenge: challenge.clone(),
        request_id: Some(request_id.to_string()),
        email: Some(email.to_string()),
        user_handle: Some(user_handle.clone()),
        auth_identity_id: None,
        allow_credentials: Vec::new(),
        issued_at: Utc::now().timestamp(),
    };
    store_challenge(ctx, REGISTRATION_CHALLENGE, request_id, &stored).await?;

    let options = RegistrationOptions {
        challenge,
        rp_id: config.rp_id.clone(),
        rp: RelyingParty {
            name: config.rp_name.clone(),
            id: config.rp_id.clone(),
        },
        user: PublicKeyCredentialUserEntity {
            id: user_handle,
            name: email.to_string(),
            display_name: display_name.to_string(),
        },
        pub_key_cred_params: vec![PubKeyCredParam {
            type_: "public-key".to_string(),
            alg: ES256_ALG,
        }],
        authenticator_selection: AuthenticatorSelection {
            authenticator_attachment: config.authenticator_attachment.clone(),
            resident_key: config.resident_key.clone(),
            require_resident_key: config.require_resident_key,
            user_verification: config.user_verification.clone(),
        },
        timeout: config.timeout * 1000, // milliseconds
        attestation: config.attestation.clone(),
    };

    tracing::debug!(rp_id = %options.rp_id, "Registration options issued");
    Ok(options)
}

/// Consume the registration challenge and verify the attestation. Nothing is persisted.
#[tracing::instrument(skip(ctx, reg), fields(credential_id = %reg.id))]
pub(crate) async fn verify_registration(
    ctx: &AuthContext,
    request_id: &str,
    reg: &RegisterCredential,
) -> Result<VerifiedRegistration, PasskeyError> {
    let config = &ctx.config().passkey;
    let stored = take_challenge(ctx, REGISTRATION_CHALLENGE, request_id).await?;

    if reg.type_ != "public-key" {
        return Err(PasskeyError::Format(format!(
            "Unsupported credential type: {}",
            reg.type_
        )));
    }
    if reg.id != reg.raw_id {
        return Err(PasskeyError::Format("Credential id and rawId differ".into()));
    }
    if stored.request_id.as_deref() != Some(request_id) {
        return Err(PasskeyError::Challenge("Challenge belongs to another request".into()));
    }

    let client_data = ParsedClientData::from_base64(&reg.response.client_data_json)?;
    client_data.verify("webauthn.create", &stored.challenge, config)?;

    let attestation = AttestationObject::from_base64(&reg.response.attestation_object)?;
    let auth_data = AuthenticatorData::parse(attestation.auth_data.clone())?;
    auth_data.verify(config)?;

    let attested = auth_data.attested.as_ref().ok_or_else(|| {
        PasskeyError::AuthenticatorData("No attested credential data".into())
    })?;

    let raw_id = base64url_decode(&reg.raw_id)
        .map_err(|e| PasskeyError::Format(format!("Invalid rawId: {e}")))?;
    if raw_id != attested.credential_id {
        return Err(PasskeyError::AuthenticatorData(
            "Credential id does not match authenticator data".into(),
        ));
    }

    verify_attestation(&attestation, &auth_data, &client_data.hash())?;

    let email = stored
        .email
        .ok_or_else(|| PasskeyError::Challenge("Challenge has no email".into()))?;
    let user_handle = stored
        .user_handle
        .ok_or_else(|| PasskeyError::Challenge("Challenge has no user handle".into()))?;

    let device_type = if auth_data.is_backup_eligible() {
        DeviceType::MultiDevice
    } else {
        DeviceType::SingleDevice
    };

    tracing::debug!(
        fmt = %attestation.fmt,
        device_type = device_type.as_str(),
        counter = auth_data.counter,
        "Attestation verified"
    );

    Ok(VerifiedRegistration {
        request_id: request_id.to_string(),
        email,
        external_credential_id: base64url_encode(&attested.credential_id),
        public_key: base64url_encode(attested.public_key.to_uncompressed()),
        sign_counter: auth_data.counter,
        device_type,
        aaguid: Uuid::from_bytes(attested.aaguid).hyphenated().to_string(),
        user_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::main::test_utils::MockAuthenticator;
    use crate::test_utils::test_context;

    #[tokio::test]
    async fn test_start_registration_offers_es256_only() {
        let ctx = test_context().await;
        let options = start_registration(&ctx, "req-1", "a@example.com", "Alice")
            .await
            .unwrap();

        assert_eq!(options.rp_id, "example.com");
        assert_eq!(options.pub_key_cred_params.len(), 1);
        assert_eq!(options.pub_key_cred_params[0].alg, -7);
        assert_eq!(options.user.name, "a@example.com");
        assert_eq!(options.timeout, 60_000);
    }

    #[tokio::test]
    async fn test_user_handle_is_fresh_per_registration() {
        let ctx = test_context().await;
        let a = start_registration(&ctx, "req-1", "a@example.com", "A").await.unwrap();
        let b = start_registration(&ctx, "req-2", "a@example.com", "A").await.unwrap();
        assert_ne!(a.user.id, b.user.id);
        assert_ne!(a.challenge, b.challenge);
    }

    #[tokio::test]
    async fn test_verify_registration_none_attestation() {
        let ctx = test_context().await;
        let options = start_registration(&ctx, "req-1", "a@example.com", "A").await.unwrap();
        let authenticator = MockAuthenticator::new(&ctx.config().passkey);

        let verified = verify_registration(&ctx, "req-1", &authenticator.create(&options.challenge))
            .await
            .unwrap();

        assert_eq!(verified.email, "a@example.com");
        assert_eq!(verified.user_handle, options.user.id);
        assert_eq!(verified.external_credential_id, authenticator.credential_id());
        assert_eq!(verified.device_type, DeviceType::SingleDevice);
        assert_eq!(verified.sign_counter, 0);
    }

    #[tokio::test]
    async fn test_verify_registration_packed_self_attestation() {
        let ctx = test_context().await;
        let options = start_registration(&ctx, "req-1", "a@example.com", "A").await.unwrap();
        let authenticator = MockAuthenticator::new(&ctx.config().passkey);

        let reg = authenticator.create_packed(&options.challenge);
        assert!(verify_registration(&ctx, "req-1", &reg).await.is_ok());
    }

    #[tokio::test]
    async fn test_challenge_cannot_be_reused() {
        let ctx = test_context().await;
        let options = start_registration(&ctx, "req-1", "a@example.com", "A").await.unwrap();
        let authenticator = MockAuthenticator::new(&ctx.config().passkey);
        let reg = authenticator.create(&options.challenge);

        verify_registration(&ctx, "req-1", &reg).await.unwrap();
        assert!(matches!(
            verify_registration(&ctx, "req-1", &reg).await,
            Err(PasskeyError::Challenge(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_origin_is_rejected() {
        let ctx = test_context().await;
        let options = start_registration(&ctx, "req-1", "a@example.com", "A").await.unwrap();
        let mut authenticator = MockAuthenticator::new(&ctx.config().passkey);
        authenticator.origin = "https://evil.example".to_string();

        assert!(matches!(
            verify_registration(&ctx, "req-1", &authenticator.create(&options.challenge)).await,
            Err(PasskeyError::ClientData(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_challenge_is_rejected() {
        let ctx = test_context().await;
        start_registration(&ctx, "req-1", "a@example.com", "A").await.unwrap();
        let authenticator = MockAuthenticator::new(&ctx.config().passkey);

        assert!(matches!(
            verify_registration(&ctx, "req-1", &authenticator.create("not-the-challenge")).await,
            Err(PasskeyError::Challenge(_))
        ));
    }
}
