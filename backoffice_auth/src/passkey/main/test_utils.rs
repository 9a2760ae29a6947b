//! Software authenticator for exercising both ceremonies in unit tests.

use ciborium::value::Value as CborValue;
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};

use super::types::{
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
    RegisterCredential, auth_data_flags,
};
use crate::passkey::config::PasskeyConfig;
use crate::utils::{base64url_encode, sha256};

pub(crate) struct MockAuthenticator {
    key: EcdsaKeyPair,
    credential_id: Vec<u8>,
    pub(crate) rp_id: String,
    pub(crate) origin: String,
    pub(crate) flags: u8,
}

impl MockAuthenticator {
    pub(crate) fn new(config: &PasskeyConfig) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let key =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .unwrap();
        let credential_id = sha256(pkcs8.as_ref())[..16].to_vec();

        Self {
            key,
            credential_id,
            rp_id: config.rp_id.clone(),
            origin: config.origin.clone(),
            flags: auth_data_flags::UP | auth_data_flags::UV,
        }
    }

    pub(crate) fn credential_id(&self) -> String {
        base64url_encode(&self.credential_id)
    }

    fn client_data(&self, type_: &str, challenge: &str) -> Vec<u8> {
        serde_json::json!({
            "type": type_,
            "challenge": challenge,
            "origin": self.origin,
        })
        .to_string()
        .into_bytes()
    }

    fn cose_key(&self) -> CborValue {
        let point = self.key.public_key().as_ref();
        CborValue::Map(vec![
            (CborValue::Integer(1.into()), CborValue::Integer(2.into())),
            (CborValue::Integer(3.into()), CborValue::Integer((-7).into())),
            (CborValue::Integer((-1).into()), CborValue::Integer(1.into())),
            (CborValue::Integer((-2).into()), CborValue::Bytes(point[1..33].to_vec())),
            (CborValue::Integer((-3).into()), CborValue::Bytes(point[33..65].to_vec())),
        ])
    }

    fn auth_data(&self, counter: u32, attested: bool) -> Vec<u8> {
        let mut data = sha256(self.rp_id.as_bytes());
        let flags = if attested {
            self.flags | auth_data_flags::AT
        } else {
            self.flags
        };
        data.push(flags);
        data.extend_from_slice(&counter.to_be_bytes());
        if attested {
            data.extend_from_slice(&[0u8; 16]);
            data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            data.extend_from_slice(&self.credential_id);
            ciborium::ser::into_writer(&self.cose_key(), &mut data).unwrap();
        }
        data
    }

    fn sign(&self, auth_data: &[u8], client_data: &[u8]) -> Vec<u8> {
        let mut signed = auth_data.to_vec();
        signed.extend_from_slice(&sha256(client_data));
        self.key
            .sign(&SystemRandom::new(), &signed)
            .unwrap()
            .as_ref()
            .to_vec()
    }

    fn registration(&self, fmt: &str, challenge: &str, packed: bool) -> RegisterCredential {
        let client_data = self.client_data("webauthn.create", challenge);
        let auth_data = self.auth_data(0, true);

        let att_stmt = if packed {
            vec![
                (CborValue::Text("alg".into()), CborValue::Integer((-7).into())),
                (
                    CborValue::Text("sig".into()),
                    CborValue::Bytes(self.sign(&auth_data, &client_data)),
                ),
            ]
        } else {
            vec![]
        };

        let attestation = CborValue::Map(vec![
            (CborValue::Text("fmt".into()), CborValue::Text(fmt.into())),
            (CborValue::Text("attStmt".into()), CborValue::Map(att_stmt)),
            (CborValue::Text("authData".into()), CborValue::Bytes(auth_data)),
        ]);
        let mut attestation_bytes = Vec::new();
        ciborium::ser::into_writer(&attestation, &mut attestation_bytes).unwrap();

        RegisterCredential {
            id: self.credential_id(),
            raw_id: self.credential_id(),
            response: AuthenticatorAttestationResponse {
                client_data_json: base64url_encode(client_data),
                attestation_object: base64url_encode(attestation_bytes),
            },
            type_: "public-key".to_string(),
        }
    }

    /// Registration response with `none` attestation.
    pub(crate) fn create(&self, challenge: &str) -> RegisterCredential {
        self.registration("none", challenge, false)
    }

    /// Registration response with `packed` self attestation.
    pub(crate) fn create_packed(&self, challenge: &str) -> RegisterCredential {
        self.registration("packed", challenge, true)
    }

    pub(crate) fn get(
        &self,
        challenge: &str,
        auth_id: &str,
        counter: u32,
        user_handle: Option<&str>,
    ) -> AuthenticatorResponse {
        let client_data = self.client_data("webauthn.get", challenge);
        let auth_data = self.auth_data(counter, false);
        let signature = self.sign(&auth_data, &client_data);

        AuthenticatorResponse {
            id: self.credential_id(),
            raw_id: self.credential_id(),
            response: AuthenticatorAssertionResponse {
                client_data_json: base64url_encode(client_data),
                authenticator_data: base64url_encode(auth_data),
                signature: base64url_encode(signature),
                user_handle: user_handle.map(str::to_string),
            },
            auth_id: auth_id.to_string(),
        }
    }
}

/// Create an identity for `email` and register a fresh mock authenticator to it.
pub(crate) async fn register_passkey(
    ctx: &crate::context::AuthContext,
    email: &str,
) -> (MockAuthenticator, crate::passkey::types::PasskeyCredential) {
    use crate::identity::{IdentitySeed, Role, ensure_identity};
    use crate::passkey::storage::PasskeyStore;
    use crate::storage::DataConn;

    let seed = IdentitySeed::new("Test User", Role::Staff, Some("tenant-a".to_string()));
    let outcome = ensure_identity(ctx.data_store(), email, Some(&seed))
        .await
        .unwrap();

    let request_id = uuid::Uuid::new_v4().to_string();
    let options = super::register::start_registration(ctx, &request_id, email, "Test User")
        .await
        .unwrap();
    let authenticator = MockAuthenticator::new(&ctx.config().passkey);
    let verified = super::register::verify_registration(
        ctx,
        &request_id,
        &authenticator.create(&options.challenge),
    )
    .await
    .unwrap();

    let credential = verified.into_credential(&outcome.identity.id);
    let mut conn = DataConn::acquire(ctx.data_store()).await.unwrap();
    PasskeyStore::insert(&mut conn, &credential).await.unwrap();

    (authenticator, credential)
}
