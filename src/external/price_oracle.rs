use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::{Asset, Timestamp};

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("unsupported asset: {0}")]
    Unsupported(String),
}

impl From<PriceProviderError> for AppError {
    fn from(value: PriceProviderError) -> Self {
        match value {
            PriceProviderError::RateLimited => AppError::RateLimited,
            other => AppError::Remote(other.to_string()),
        }
    }
}

/// Fetches hourly price history for a pair and stores it in the global price cache.
#[async_trait]
pub trait HistoricalPriceCache: Send + Sync {
    async fn query_and_store_historical_data(
        &self,
        from_asset: &Asset,
        to_asset: &Asset,
        timestamp: Timestamp,
    ) -> Result<(), AppError>;
}

/// Resolves the price of an asset at a point in time.
#[async_trait]
pub trait PriceHistorian: Send + Sync {
    /// Fails with [`AppError::NoPriceForGivenTimestamp`] or [`AppError::Remote`]
    /// when no price can be determined.
    async fn query_historical_price(
        &self,
        from_asset: &Asset,
        to_asset: &str,
        timestamp: Timestamp,
    ) -> Result<BigDecimal, AppError>;
}
