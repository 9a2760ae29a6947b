use ciborium::value::{Integer, Value as CborValue};
use serde::{Deserialize, Serialize};

use crate::passkey::config::PasskeyConfig;
use crate::passkey::errors::PasskeyError;
use crate::utils::{base64url_decode, sha256};

const COSE_KTY_EC2: i64 = 2;
const COSE_ALG_ES256: i64 = -7;
const COSE_CRV_P256: i64 = 1;

/// Options handed to `navigator.credentials.get()`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    pub timeout: u32,
    pub rp_id: String,
    pub allow_credentials: Vec<AllowCredential>,
    pub user_verification: String,
    /// Key of the stored challenge; echoed back in [`AuthenticatorResponse`]
    pub auth_id: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct AllowCredential {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    pub resident_key: String,
    pub require_resident_key: bool,
    pub user_verification: String,
}

/// Options handed to `navigator.credentials.create()`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String,
    pub rp_id: String,
    pub rp: RelyingParty,
    pub user: PublicKeyCredentialUserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub authenticator_selection: AuthenticatorSelection,
    pub timeout: u32,
    pub attestation: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialUserEntity {
    /// base64url user handle
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i32,
}

/// `PublicKeyCredential` returned by `navigator.credentials.create()`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCredential {
    pub id: String,
    pub raw_id: String,
    pub response: AuthenticatorAttestationResponse,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
}

/// `PublicKeyCredential` returned by `navigator.credentials.get()`, plus the `authId`
/// from [`AuthenticationOptions`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AuthenticatorAssertionResponse,
    pub auth_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default)]
    pub user_handle: Option<String>,
}

#[derive(Debug)]
pub(super) struct AttestationObject {
    pub(super) fmt: String,
    pub(super) auth_data: Vec<u8>,
    pub(super) att_stmt: Vec<(CborValue, CborValue)>,
}

impl AttestationObject {
    pub(super) fn from_base64(attestation_object: &str) -> Result<Self, PasskeyError> {
        let bytes = base64url_decode(attestation_object)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode attestation object: {e}")))?;

        let cbor: CborValue = ciborium::de::from_reader(&bytes[..])
            .map_err(|e| PasskeyError::Format(format!("Invalid CBOR data: {e}")))?;

        let CborValue::Map(map) = cbor else {
            return Err(PasskeyError::Format("Invalid attestation format".to_string()));
        };

        let mut fmt = None;
        let mut auth_data = None;
        let mut att_stmt = None;
        for (key, value) in map {
            match (key, value) {
                (CborValue::Text(k), CborValue::Text(f)) if k == "fmt" => fmt = Some(f),
                (CborValue::Text(k), CborValue::Bytes(d)) if k == "authData" => auth_data = Some(d),
                (CborValue::Text(k), CborValue::Map(s)) if k == "attStmt" => att_stmt = Some(s),
                _ => {}
            }
        }

        match (fmt, auth_data, att_stmt) {
            (Some(fmt), Some(auth_data), Some(att_stmt)) => Ok(Self {
                fmt,
                auth_data,
                att_stmt,
            }),
            _ => Err(PasskeyError::Format(
                "Missing required attestation data".to_string(),
            )),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ClientDataFields {
    #[serde(rename = "type")]
    type_: String,
    challenge: String,
    origin: String,
}

/// Decoded `clientDataJSON`; the raw bytes are kept for hashing.
#[derive(Debug)]
pub(super) struct ParsedClientData {
    pub(super) challenge: String,
    pub(super) origin: String,
    pub(super) type_: String,
    pub(super) raw_data: Vec<u8>,
}

impl ParsedClientData {
    pub(super) fn from_base64(client_data_json: &str) -> Result<Self, PasskeyError> {
        let raw_data = base64url_decode(client_data_json)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode client data: {e}")))?;

        let fields: ClientDataFields = serde_json::from_slice(&raw_data)
            .map_err(|e| PasskeyError::ClientData(format!("Invalid client data JSON: {e}")))?;

        Ok(Self {
            challenge: fields.challenge,
            origin: fields.origin,
            type_: fields.type_,
            raw_data,
        })
    }

    /// Check ceremony type, challenge and origin.
    pub(super) fn verify(
        &self,
        expected_type: &str,
        stored_challenge: &str,
        config: &PasskeyConfig,
    ) -> Result<(), PasskeyError> {
        if self.type_ != expected_type {
            return Err(PasskeyError::ClientData(format!(
                "Invalid type. Expected '{}', Got: {}",
                expected_type, self.type_
            )));
        }

        if self.challenge != stored_challenge {
            return Err(PasskeyError::Challenge(
                "Challenge mismatch. For more details, run with RUST_LOG=debug".into(),
            ));
        }

        if self.origin.trim_end_matches('/') != config.origin {
            return Err(PasskeyError::ClientData(format!(
                "Invalid origin. Expected: {}, Got: {}",
                config.origin, self.origin
            )));
        }

        Ok(())
    }

    pub(super) fn hash(&self) -> Vec<u8> {
        sha256(&self.raw_data)
    }
}

/// Flags byte of the authenticator data
pub(super) mod auth_data_flags {
    /// User Present
    pub(crate) const UP: u8 = 1 << 0;
    /// User Verified
    pub(crate) const UV: u8 = 1 << 2;
    /// Backup Eligibility
    pub(crate) const BE: u8 = 1 << 3;
    /// Backup State
    pub(crate) const BS: u8 = 1 << 4;
    /// Attested credential data present
    pub(crate) const AT: u8 = 1 << 6;
}

/// EC2 P-256 public key from a COSE_Key map.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CoseEc2Key {
    pub(super) x: Vec<u8>,
    pub(super) y: Vec<u8>,
}

impl CoseEc2Key {
    pub(super) fn from_cbor(value: &CborValue) -> Result<Self, PasskeyError> {
        let CborValue::Map(map) = value else {
            return Err(PasskeyError::Format("Invalid public key format".to_string()));
        };

        let mut kty = None;
        let mut alg = None;
        let mut crv = None;
        let mut x = None;
        let mut y = None;
        for (key, value) in map {
            let CborValue::Integer(label) = key else {
                continue;
            };
            match (integer_to_i64(label)?, value) {
                (1, CborValue::Integer(v)) => kty = Some(integer_to_i64(v)?),
                (3, CborValue::Integer(v)) => alg = Some(integer_to_i64(v)?),
                (-1, CborValue::Integer(v)) => crv = Some(integer_to_i64(v)?),
                (-2, CborValue::Bytes(v)) => x = Some(v.clone()),
                (-3, CborValue::Bytes(v)) => y = Some(v.clone()),
                _ => {}
            }
        }

        if kty != Some(COSE_KTY_EC2) || crv != Some(COSE_CRV_P256) {
            return Err(PasskeyError::Format(
                "Only EC2 P-256 credential keys are supported".to_string(),
            ));
        }
        if alg != Some(COSE_ALG_ES256) {
            return Err(PasskeyError::Format(format!(
                "Unsupported credential algorithm: {alg:?}"
            )));
        }

        match (x, y) {
            (Some(x), Some(y)) if x.len() == 32 && y.len() == 32 => Ok(Self { x, y }),
            _ => Err(PasskeyError::Format(
                "Missing or invalid key coordinates".to_string(),
            )),
        }
    }

    /// SEC1 uncompressed point, the form `ring` verifies against.
    pub(super) fn to_uncompressed(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(65);
        point.push(0x04);
        point.extend_from_slice(&self.x);
        point.extend_from_slice(&self.y);
        point
    }
}

pub(super) fn integer_to_i64(i: &Integer) -> Result<i64, PasskeyError> {
    i64::try_from(*i).map_err(|_| PasskeyError::Format("CBOR integer out of range".to_string()))
}

#[derive(Debug)]
pub(super) struct AttestedCredentialData {
    pub(super) aaguid: [u8; 16],
    pub(super) credential_id: Vec<u8>,
    pub(super) public_key: CoseEc2Key,
}

/// Authenticator data: rpIdHash(32) | flags(1) | signCount(4) | [attested credential data]
#[derive(Debug)]
pub(super) struct AuthenticatorData {
    pub(super) rp_id_hash: Vec<u8>,
    pub(super) flags: u8,
    pub(super) counter: u32,
    pub(super) attested: Option<AttestedCredentialData>,
    pub(super) raw_data: Vec<u8>,
}

impl AuthenticatorData {
    pub(super) fn from_base64(auth_data: &str) -> Result<Self, PasskeyError> {
        let data = base64url_decode(auth_data)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode: {e}")))?;
        Self::parse(data)
    }

    pub(super) fn parse(data: Vec<u8>) -> Result<Self, PasskeyError> {
        if data.len() < 37 {
            return Err(PasskeyError::AuthenticatorData(
                "Authenticator data too short".into(),
            ));
        }

        let flags = data[32];
        let counter = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);

        let attested = if flags & auth_data_flags::AT != 0 {
            Some(parse_attested_credential_data(&data[37..])?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash: data[..32].to_vec(),
            flags,
            counter,
            attested,
            raw_data: data,
        })
    }

    pub(super) fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    pub(super) fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    pub(super) fn is_backup_eligible(&self) -> bool {
        (self.flags & auth_data_flags::BE) != 0
    }

    pub(super) fn is_backed_up(&self) -> bool {
        (self.flags & auth_data_flags::BS) != 0
    }

    /// rpIdHash, UP, and UV when the relying party requires it.
    pub(super) fn verify(&self, config: &PasskeyConfig) -> Result<(), PasskeyError> {
        let expected_hash = sha256(config.rp_id.as_bytes());
        if self.rp_id_hash != expected_hash {
            return Err(PasskeyError::AuthenticatorData("Invalid RP ID hash".into()));
        }

        if !self.is_user_present() {
            return Err(PasskeyError::AuthenticatorData("User not present".into()));
        }

        if config.user_verification_required() && !self.is_user_verified() {
            return Err(PasskeyError::AuthenticatorData(format!(
                "User verification required but flag not set. Flags: {:02x}",
                self.flags
            )));
        }

        tracing::debug!(
            user_verified = self.is_user_verified(),
            backup_eligible = self.is_backup_eligible(),
            backed_up = self.is_backed_up(),
            "Authenticator data verification passed"
        );

        Ok(())
    }
}

fn parse_attested_credential_data(data: &[u8]) -> Result<AttestedCredentialData, PasskeyError> {
    if data.len() < 18 {
        return Err(PasskeyError::AuthenticatorData(
            "Attested credential data too short".into(),
        ));
    }

    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&data[..16]);

    let cred_id_len = u16::from_be_bytes([data[16], data[17]]) as usize;
    if cred_id_len == 0 || cred_id_len > 1023 {
        return Err(PasskeyError::AuthenticatorData(
            "Invalid credential ID length".into(),
        ));
    }
    let key_start = 18 + cred_id_len;
    if data.len() <= key_start {
        return Err(PasskeyError::AuthenticatorData(
            "Authenticator data too short for credential ID".into(),
        ));
    }

    let credential_id = data[18..key_start].to_vec();
    let key_cbor: CborValue = ciborium::de::from_reader(&data[key_start..])
        .map_err(|e| PasskeyError::Format(format!("Invalid public key CBOR: {e}")))?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        public_key: CoseEc2Key::from_cbor(&key_cbor)?,
    })
}
