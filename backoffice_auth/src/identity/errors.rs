use thiserror::Error;

use crate::storage::StorageError;

#[derive(Clone, Error, Debug)]
pub enum IdentityError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Identity not found: {0}")]
    NotFound(String),

    /// A non-admin identity would end up without a tenant
    #[error("Identity {0} has a non-admin role but no tenant")]
    MissingTenant(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Repeated unique-key collisions while reconciling the same email
    #[error("Reconciliation conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::InvalidData(err.to_string())
    }
}
