use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    /// Connection-level failure that is worth one more attempt
    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::UniqueViolation(db.message().to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Protocol(_) => {
                Self::Transient(err.to_string())
            }
            _ => Self::Storage(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_timeout() || err.is_connection_dropped() {
            Self::Transient(err.to_string())
        } else {
            Self::Storage(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let error = StorageError::Storage("Connection failed".to_string());
        assert_eq!(error.to_string(), "Storage error: Connection failed");
    }

    #[test]
    fn test_from_sqlx_pool_timeout_is_transient() {
        let error = StorageError::from(sqlx::Error::PoolTimedOut);
        assert!(error.is_transient());
    }

    #[test]
    fn test_from_sqlx_row_not_found_is_not_transient() {
        let error = StorageError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, StorageError::Storage(_)));
    }

    #[test]
    fn test_from_redis_io_error_is_transient() {
        let redis_error =
            redis::RedisError::from((redis::ErrorKind::IoError, "Connection refused"));
        let storage_error = StorageError::from(redis_error);
        assert!(storage_error.is_transient());
        assert!(storage_error.to_string().contains("Connection refused"));
    }

    #[test]
    fn test_from_serde_error() {
        let serde_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        match StorageError::from(serde_error) {
            StorageError::Serde(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Serde variant, got {other:?}"),
        }
    }
}
