//! The error taxonomy every public operation reports.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::passkey::PasskeyError;
use crate::registration::RegistrationError;
use crate::session::SessionError;
use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A challenge, token or session ran out of time
    #[error("Expired: {0}")]
    Expired(String),

    /// Signature counter did not advance
    #[error("Replay detected")]
    ReplayDetected,

    #[error("Tenant mismatch")]
    TenantMismatch,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    /// I/O fault in a backing store
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::ReplayDetected => tracing::warn!("Replay detected"),
            Self::Storage(msg) => tracing::error!("Storage error: {}", msg),
            Self::Internal(msg) => tracing::error!("Internal error: {}", msg),
            Self::TenantMismatch | Self::PermissionDenied => tracing::info!("{}", self),
            other => tracing::debug!("{}", other),
        }
        self
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        let error = match err {
            StorageError::UniqueViolation(msg) => Self::Conflict(msg),
            other => Self::Storage(other.to_string()),
        };
        error.log()
    }
}

impl From<UtilError> for AuthError {
    fn from(err: UtilError) -> Self {
        Self::Internal(err.to_string()).log()
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        let error = match err {
            IdentityError::Storage(e) => return e.into(),
            IdentityError::InvalidEmail(msg) => Self::Validation(format!("Invalid email: {msg}")),
            IdentityError::MissingTenant(_) => {
                Self::Validation("A non-admin role requires a tenant".into())
            }
            IdentityError::NotFound(msg) => Self::NotFound(msg),
            IdentityError::Conflict(msg) => Self::Conflict(msg),
            IdentityError::InvalidData(msg) => Self::Internal(msg),
        };
        error.log()
    }
}

impl From<PasskeyError> for AuthError {
    fn from(err: PasskeyError) -> Self {
        tracing::debug!(error = %err, "Passkey ceremony failed");
        let error = match err {
            PasskeyError::Storage(e) => return e.into(),
            PasskeyError::Identity(e) => return e.into(),
            PasskeyError::NotFound(msg) => Self::NotFound(msg),
            PasskeyError::ReplayDetected(credential_id) => {
                tracing::warn!(target: "audit", %credential_id, "Passkey counter replay");
                Self::ReplayDetected
            }
            PasskeyError::Challenge(msg) => Self::Expired(msg),
            PasskeyError::ClientData(_)
            | PasskeyError::AuthenticatorData(_)
            | PasskeyError::Verification(_) => Self::Unauthenticated,
            PasskeyError::Format(msg) | PasskeyError::InvalidRequest(msg) => Self::Validation(msg),
            PasskeyError::Forbidden(_) => Self::PermissionDenied,
            PasskeyError::Config(msg) => Self::Internal(msg),
            PasskeyError::Utils(e) => Self::Internal(e.to_string()),
        };
        error.log()
    }
}

impl From<RegistrationError> for AuthError {
    fn from(err: RegistrationError) -> Self {
        let error = match err {
            RegistrationError::Storage(e) => return e.into(),
            RegistrationError::Identity(e) => return e.into(),
            RegistrationError::InvalidInput(msg) | RegistrationError::InvalidState(msg) => {
                Self::Validation(msg)
            }
            RegistrationError::MissingTenant(role) => {
                Self::Validation(format!("Role {role} requires a tenant"))
            }
            RegistrationError::Duplicate(msg) | RegistrationError::AlreadyConsumed(msg) => {
                Self::Conflict(msg)
            }
            RegistrationError::NotFound(msg) => Self::NotFound(msg),
            RegistrationError::InvalidToken => Self::Unauthenticated,
            RegistrationError::Config(msg) => Self::Internal(msg),
            RegistrationError::Utils(e) => Self::Internal(e.to_string()),
        };
        error.log()
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        let error = match err {
            SessionError::Storage(e) => return e.into(),
            SessionError::Identity(e) => return e.into(),
            SessionError::NotFound | SessionError::Expired => Self::Unauthenticated,
            SessionError::Header(msg) => Self::Validation(msg),
            SessionError::Utils(e) => Self::Internal(e.to_string()),
        };
        error.log()
    }
}
