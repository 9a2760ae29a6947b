use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::RegistrationError;
use crate::identity::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(RegistrationError::InvalidInput(format!(
                "Unknown request status: {other}"
            ))),
        }
    }
}

/// A self-service registration request awaiting or past admin review.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub status: RequestStatus,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub token_redeemed_at: Option<DateTime<Utc>>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub auth_identity_id: Option<String>,
    pub decided_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Nonce of the outstanding approval token
    #[serde(skip)]
    pub(crate) token_nonce: Option<String>,
}

impl RegistrationRequest {
    /// Approved, token redeemed, and no credential bound yet.
    pub fn is_ready_for_ceremony(&self) -> bool {
        self.status == RequestStatus::Approved
            && self.token_redeemed_at.is_some()
            && self.consumed_at.is_none()
    }
}

/// Result of approving a request; the token is handed to the requester out of band.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedRegistration {
    pub request_id: String,
    pub approval_token: String,
    pub expires_at: DateTime<Utc>,
}
