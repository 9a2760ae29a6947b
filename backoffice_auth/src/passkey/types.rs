use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::PasskeyError;
use crate::storage::CacheData;

/// Whether the authenticator reported the credential as backup eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    SingleDevice,
    MultiDevice,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::SingleDevice => "single_device",
            DeviceType::MultiDevice => "multi_device",
        }
    }
}

impl FromStr for DeviceType {
    type Err = PasskeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_device" => Ok(DeviceType::SingleDevice),
            "multi_device" => Ok(DeviceType::MultiDevice),
            other => Err(PasskeyError::Format(format!("Unknown device type: {other}"))),
        }
    }
}

/// A passkey bound to exactly one auth identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyCredential {
    pub id: String,
    pub auth_identity_id: String,
    /// base64url credential id as reported by the authenticator
    pub external_credential_id: String,
    /// base64url uncompressed P-256 point
    #[serde(skip_serializing)]
    pub public_key: String,
    pub sign_counter: u32,
    pub device_type: DeviceType,
    pub aaguid: String,
    #[serde(skip_serializing)]
    pub user_handle: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Challenge state kept in the cache between the two halves of a ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct StoredChallenge {
    pub(super) challenge: String,
    /// Registration request the ceremony belongs to
    #[serde(default)]
    pub(super) request_id: Option<String>,
    #[serde(default)]
    pub(super) email: Option<String>,
    #[serde(default)]
    pub(super) user_handle: Option<String>,
    /// Identity whose credentials may answer an authentication challenge
    #[serde(default)]
    pub(super) auth_identity_id: Option<String>,
    #[serde(default)]
    pub(super) allow_credentials: Vec<String>,
    pub(super) issued_at: i64,
}

impl TryFrom<&StoredChallenge> for CacheData {
    type Error = PasskeyError;

    fn try_from(data: &StoredChallenge) -> Result<Self, Self::Error> {
        Ok(Self {
            value: serde_json::to_string(data)?,
        })
    }
}

impl TryFrom<CacheData> for StoredChallenge {
    type Error = PasskeyError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value)
            .map_err(|e| PasskeyError::Challenge(format!("Corrupt challenge: {e}")))
    }
}
