use thiserror::Error;

use crate::identity::IdentityError;
use crate::storage::StorageError;
use crate::utils::UtilError;

/// Errors from the registration and authentication ceremonies and the credential store.
#[derive(Debug, Error)]
pub enum PasskeyError {
    /// Invalid relying-party configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing, expired or mismatched challenge
    #[error("Invalid challenge: {0}")]
    Challenge(String),

    /// The ceremony was started in a way this relying party does not accept
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid client data: {0}")]
    ClientData(String),

    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// Attestation or assertion signature did not verify
    #[error("Verification error: {0}")]
    Verification(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Not found error: {0}")]
    NotFound(String),

    /// Presented signature counter did not advance past the stored one
    #[error("Signature counter replay for credential {0}")]
    ReplayDetected(String),

    /// Caller may not act on the credential
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<serde_json::Error> for PasskeyError {
    fn from(err: serde_json::Error) -> Self {
        PasskeyError::Format(err.to_string())
    }
}
