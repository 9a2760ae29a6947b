//! P-256 software authenticator producing the JSON a browser would send.

use backoffice_auth::{
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorResponse,
    RegisterCredential,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ciborium::value::Value as CborValue;
use ring::digest::{SHA256, digest};
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};

const FLAG_UP: u8 = 0x01;
const FLAG_UV: u8 = 0x04;
const FLAG_AT: u8 = 0x40;

pub struct MockAuthenticator {
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
    pub fn new(origin: &str) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .expect("Failed to generate key pair");
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
            .expect("Failed to load key pair");
        let rp_id = url::Url::parse(origin)
            .expect("Invalid origin")
            .host_str()
            .expect("Origin without host")
            .to_string();

        Self {
            credential_id: sha256(pkcs8.as_ref())[..16].to_vec(),
            key,
            rp_id,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn credential_id(&self) -> String {
        b64(&self.credential_id)
    }

    fn client_data(&self, type_: &str, challenge: &str) -> Vec<u8> {
        serde_json::json!({
            "type": type_,
            "challenge": challenge,
            "origin": self.origin,
            "crossOrigin": false,
        })
        .to_string()
        .into_bytes()
    }

    fn authenticator_data(&self, counter: u32, attested: bool) -> Vec<u8> {
        let mut data = sha256(self.rp_id.as_bytes());
        let mut flags = FLAG_UP | FLAG_UV;
        if attested {
            flags |= FLAG_AT;
        }
        data.push(flags);
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
            ciborium::ser::into_writer(&cose_key, &mut data).expect("CBOR encoding failed");
        }
        data
    }

    fn sign(&self, authenticator_data: &[u8], client_data: &[u8]) -> Vec<u8> {
        let mut message = authenticator_data.to_vec();
        message.extend_from_slice(&sha256(client_data));
        self.key
            .sign(&SystemRandom::new(), &message)
            .expect("Signing failed")
            .as_ref()
            .to_vec()
    }

    /// `navigator.credentials.create()` with packed self attestation.
    pub fn create(&self, challenge: &str) -> RegisterCredential {
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
        ciborium::ser::into_writer(&attestation, &mut attestation_object)
            .expect("CBOR encoding failed");

        RegisterCredential {
            id: self.credential_id(),
            raw_id: self.credential_id(),
            response: AuthenticatorAttestationResponse {
                client_data_json: b64(client_data),
                attestation_object: b64(attestation_object),
            },
            type_: "public-key".to_string(),
        }
    }

    /// `navigator.credentials.get()` reporting `counter`.
    pub fn get(&self, challenge: &str, auth_id: &str, counter: u32) -> AuthenticatorResponse {
        let client_data = self.client_data("webauthn.get", challenge);
        let auth_data = self.authenticator_data(counter, false);
        let signature = self.sign(&auth_data, &client_data);

        AuthenticatorResponse {
            id: self.credential_id(),
            raw_id: self.credential_id(),
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
