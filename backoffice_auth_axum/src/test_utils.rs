//! Shared helpers for handler tests: an isolated context per test, a oneshot request helper
//! and a software authenticator so sessions come from real ceremonies.

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{
        Method, Request,
        header::{CONTENT_TYPE, COOKIE},
    },
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;

use backoffice_auth::{
    ApproveRegistrationBody, AuthConfig, AuthContext, InMemoryCacheStore, ModulePermissions,
    PasskeyConfig, RegistrationConfig, RegistrationFinishRequest, RegistrationRequestBody,
    RegistrationStartRequest, Role, SessionConfig, SessionUser, SqliteDataStore,
    approve_registration_core, handle_finish_registration_core, handle_start_registration_core,
    request_registration_core, validate_token_core,
};

use crate::router::backoffice_auth_router;

pub(crate) use authenticator::MockAuthenticator;

pub(crate) const ORIGIN: &str = "https://backoffice.example.com";

pub(crate) async fn test_context() -> AuthContext {
    let config = AuthConfig::new(
        PasskeyConfig::new(ORIGIN).unwrap(),
        SessionConfig::default(),
        RegistrationConfig::new(b"axum-handler-test-secret-0123456789".to_vec()).unwrap(),
    );
    let store = SqliteDataStore::in_memory().await.unwrap();
    let ctx = AuthContext::new(Arc::new(store), Box::new(InMemoryCacheStore::new()), config);
    ctx.init().await.unwrap();
    ctx
}

/// One request through a fresh router sharing `ctx`.
pub(crate) async fn send(
    ctx: &AuthContext,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("origin", ORIGIN);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    backoffice_auth_router(ctx.clone())
        .oneshot(request)
        .await
        .unwrap()
}

/// The response body as JSON; plain-text error bodies come back as a JSON string.
pub(crate) async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

/// The `name=value` pair from a response's `Set-Cookie`.
pub(crate) fn cookie_pair(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn approver() -> SessionUser {
    SessionUser {
        id: "approver".to_string(),
        email: "approver@example.com".to_string(),
        display_name: "Approver".to_string(),
        username: "approver".to_string(),
        role: Role::Admin,
        tenant_id: None,
        module_permissions: ModulePermissions::new(),
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    }
}

/// Request, approve and redeem for `email`. Returns the request id and approval token.
pub(crate) async fn approved_request(
    ctx: &AuthContext,
    email: &str,
    role: Role,
    tenant_id: Option<&str>,
) -> (String, String) {
    let request_id = request_registration_core(
        ctx,
        RegistrationRequestBody {
            email: email.to_string(),
            display_name: "Handler User".to_string(),
            tenant_id: tenant_id.map(str::to_string),
        },
    )
    .await
    .unwrap();
    let approved = approve_registration_core(
        ctx,
        &approver(),
        ApproveRegistrationBody {
            request_id: request_id.clone(),
            role: Some(role),
            tenant_id: tenant_id.map(str::to_string),
        },
    )
    .await
    .unwrap();
    validate_token_core(ctx, &request_id, &approved.approval_token, email)
        .await
        .unwrap();
    (request_id, approved.approval_token)
}

/// Onboard `email` through the real ceremony and return its session cookie.
pub(crate) async fn session_cookie(
    ctx: &AuthContext,
    email: &str,
    role: Role,
    tenant_id: Option<&str>,
) -> String {
    let (request_id, token) = approved_request(ctx, email, role, tenant_id).await;
    let options = handle_start_registration_core(
        ctx,
        RegistrationStartRequest {
            request_id: request_id.clone(),
            token,
        },
    )
    .await
    .unwrap();
    let authenticator = MockAuthenticator::new(ORIGIN);
    let (_, issued) = handle_finish_registration_core(
        ctx,
        RegistrationFinishRequest {
            request_id,
            credential: authenticator.create(&options.challenge),
        },
    )
    .await
    .unwrap();
    format!("{}={}", ctx.config().session.cookie_name, issued.token)
}

pub(crate) async fn admin_cookie(ctx: &AuthContext) -> String {
    session_cookie(ctx, "admin@example.com", Role::Admin, None).await
}

pub(crate) async fn user_cookie(ctx: &AuthContext, email: &str) -> String {
    session_cookie(ctx, email, Role::User, Some("t-1")).await
}

mod authenticator {
    use backoffice_auth::{
        AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
        RegisterCredential,
    };
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use ciborium::value::Value as CborValue;
    use ring::digest::{SHA256, digest};
    use ring::rand::SystemRandom;
    use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};

    /// P-256 authenticator with packed self attestation, user presence and verification set.
    pub(crate) struct MockAuthenticator {
        key: EcdsaKeyPair,
        credential_id: Vec<u8>,
        rp_id: String,
        origin: String,
    }

    fn sha256(data: &[u8]) -> Vec<u8> {
        digest(&SHA256, data).as_ref().to_vec()
    }

    fn b64(data: impl AsRef<[u8]>) -> String {
        URL_SAFE_NO_PAD.encode(data)
    }

    impl MockAuthenticator {
        pub(crate) fn new(origin: &str) -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
            let key =
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                    .unwrap();
            let rp_id = url::Url::parse(origin)
                .unwrap()
                .host_str()
                .unwrap()
                .to_string();
            Self {
                credential_id: sha256(pkcs8.as_ref())[..16].to_vec(),
                key,
                rp_id,
                origin: origin.to_string(),
            }
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

        fn authenticator_data(&self, counter: u32, attested: bool) -> Vec<u8> {
            let mut data = sha256(self.rp_id.as_bytes());
            data.push(if attested { 0x45 } else { 0x05 });
            data.extend_from_slice(&counter.to_be_bytes());
            if attested {
                let point = self.key.public_key().as_ref();
                let cose_key = CborValue::Map(vec![
                    (CborValue::Integer(1.into()), CborValue::Integer(2.into())),
                    (CborValue::Integer(3.into()), CborValue::Integer((-7).into())),
                    (CborValue::Integer((-1).into()), CborValue::Integer(1.into())),
                    (CborValue::Integer((-2).into()), CborValue::Bytes(point[1..33].to_vec())),
                    (CborValue::Integer((-3).into()), CborValue::Bytes(point[33..65].to_vec())),
                ]);
                data.extend_from_slice(&[0u8; 16]);
                data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
                data.extend_from_slice(&self.credential_id);
                ciborium::ser::into_writer(&cose_key, &mut data).unwrap();
            }
            data
        }

        fn sign(&self, authenticator_data: &[u8], client_data: &[u8]) -> Vec<u8> {
            let mut message = authenticator_data.to_vec();
            message.extend_from_slice(&sha256(client_data));
            self.key
                .sign(&SystemRandom::new(), &message)
                .unwrap()
                .as_ref()
                .to_vec()
        }

        pub(crate) fn create(&self, challenge: &str) -> RegisterCredential {
            let client_data = self.client_data("webauthn.create", challenge);
            let auth_data = self.authenticator_data(0, true);
            let signature = self.sign(&auth_data, &client_data);
            let attestation = CborValue::Map(vec![
                (CborValue::Text("fmt".into()), CborValue::Text("packed".into())),
                (
                    CborValue::Text("attStmt".into()),
                    CborValue::Map(vec![
                        (CborValue::Text("alg".into()), CborValue::Integer((-7).into())),
                        (CborValue::Text("sig".into()), CborValue::Bytes(signature)),
                    ]),
                ),
                (CborValue::Text("authData".into()), CborValue::Bytes(auth_data)),
            ]);
            let mut attestation_object = Vec::new();
            ciborium::ser::into_writer(&attestation, &mut attestation_object).unwrap();

            RegisterCredential {
                id: b64(&self.credential_id),
                raw_id: b64(&self.credential_id),
                response: AuthenticatorAttestationResponse {
                    client_data_json: b64(client_data),
                    attestation_object: b64(attestation_object),
                },
                type_: "public-key".to_string(),
            }
        }

        pub(crate) fn get(&self, challenge: &str, auth_id: &str, counter: u32) -> AuthenticatorResponse {
            let client_data = self.client_data("webauthn.get", challenge);
            let auth_data = self.authenticator_data(counter, false);
            let signature = self.sign(&auth_data, &client_data);
            AuthenticatorResponse {
                id: b64(&self.credential_id),
                raw_id: b64(&self.credential_id),
                response: AuthenticatorAssertionResponse {
                    client_data_json: b64(client_data),
                    authenticator_data: b64(auth_data),
                    signature: b64(signature),
                    user_handle: None,
                },
                auth_id: auth_id.to_string(),
            }
        }
    }
}
