use thiserror::Error;

use crate::identity::IdentityError;
use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum RegistrationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An identity or an open request already exists for the email
    #[error("Duplicate registration: {0}")]
    Duplicate(String),

    #[error("Registration request not found: {0}")]
    NotFound(String),

    /// The request is not in a state that allows the operation
    #[error("Invalid request state: {0}")]
    InvalidState(String),

    /// Every approval token rejection looks the same to the caller
    #[error("Invalid or expired approval token")]
    InvalidToken,

    /// The ceremony for this request already bound a credential
    #[error("Registration request already consumed: {0}")]
    AlreadyConsumed(String),

    #[error("Role {0} requires a tenant")]
    MissingTenant(String),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
