use sqlx::Error;
use thiserror::Error;

use crate::models::Timestamp;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("External error: {0}")]
    External(String),
    #[error("Remote error: {0}")]
    Remote(String),
    #[error("No price found for {asset} at {timestamp}")]
    NoPriceForGivenTimestamp { asset: String, timestamp: Timestamp },
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    /// Price lookups that failed for reasons worth remembering for the rest of the run.
    pub fn is_price_lookup_failure(&self) -> bool {
        matches!(
            self,
            AppError::NoPriceForGivenTimestamp { .. } | AppError::Remote(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: Error) -> Self {
        if let Error::Database(db_err) = &value {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return AppError::Conflict(db_err.message().to_string());
            }
        }
        AppError::Db(value)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        AppError::Remote(value.to_string())
    }
}
