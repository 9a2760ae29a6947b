use thiserror::Error;

use crate::identity::IdentityError;
use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// No session for the presented token, or the identity behind it is gone
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),

    #[error("Header error: {0}")]
    Header(String),
}
