use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    /// The local store could not accept a write; the action was not queued.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    /// A remote call for a queued record failed.
    #[error("Sync failed: {0}")]
    SyncFailed(String),

    /// A dependent reference could not be resolved to a server id.
    #[error("Reconciliation gap: {0}")]
    ReconciliationGap(String),

    #[error("Max retries exceeded for {record_id} after {retry_count} attempts")]
    MaxRetriesExceeded { record_id: String, retry_count: u32 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Failures that are worth another attempt on the next pass.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::SyncFailed(_) | AppError::Database(_)
        )
    }

    /// Maps a store error onto the write path, where an unusable backend
    /// must surface as `StorageUnavailable`.
    pub fn storage_write(err: sqlx::Error) -> Self {
        if is_unavailable(&err) {
            AppError::StorageUnavailable(err.to_string())
        } else {
            AppError::Database(err.to_string())
        }
    }
}

fn is_unavailable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => {
            // SQLITE_READONLY(8), SQLITE_IOERR(10), SQLITE_CORRUPT(11), SQLITE_FULL(13),
            // SQLITE_CANTOPEN(14), SQLITE_NOTADB(26); extended codes keep the primary in the low byte.
            db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| matches!(code & 0xff, 8 | 10 | 11 | 13 | 14 | 26))
                .unwrap_or(false)
        }
        _ => false,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_pool_maps_to_storage_unavailable() {
        let err = AppError::storage_write(sqlx::Error::PoolClosed);
        assert!(matches!(err, AppError::StorageUnavailable(_)));
    }

    #[test]
    fn row_not_found_stays_a_database_error() {
        let err = AppError::storage_write(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(AppError::SyncFailed("500".to_string()).is_retryable());
        assert!(!AppError::NotFound("/surveys/sv-1".to_string()).is_retryable());
        assert!(!AppError::ValidationError("missing id".to_string()).is_retryable());
    }

    #[test]
    fn max_retries_message_names_the_record() {
        let err = AppError::MaxRetriesExceeded {
            record_id: "wo-1".to_string(),
            retry_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "Max retries exceeded for wo-1 after 3 attempts"
        );
    }
}
