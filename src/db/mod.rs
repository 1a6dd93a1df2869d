//! Persistence layer used by the task manager.
//!
//! The scheduler only talks to the [`TaskStore`] and [`PriceRangeStore`]
//! traits. [`PgTaskStore`] implements both on top of the query modules below.

pub mod account_queries;
pub mod asset_queries;
pub mod eth_tx_queries;
pub mod history_event_queries;
pub mod price_history_queries;
pub mod query_range_queries;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::{
    Asset, EthAddress, EthTransaction, HistoricalPriceOracle, MissingPriceEntry, Timestamp,
    TxHash, TxReceipt, XpubData,
};

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn query_owned_assets(&self) -> Result<Vec<Asset>, AppError>;

    async fn get_main_currency(&self) -> Result<Asset, AppError>;

    async fn get_used_query_range(
        &self,
        name: &str,
    ) -> Result<Option<(Timestamp, Timestamp)>, AppError>;

    async fn update_used_query_range(
        &self,
        name: &str,
        start_ts: Timestamp,
        end_ts: Timestamp,
    ) -> Result<(), AppError>;

    async fn get_bitcoin_xpub_data(&self) -> Result<Vec<XpubData>, AppError>;

    async fn get_eth_accounts(&self) -> Result<Vec<EthAddress>, AppError>;

    async fn add_ethereum_transactions(
        &self,
        transactions: &[EthTransaction],
    ) -> Result<(), AppError>;

    async fn tx_hashes_missing_receipts(&self, limit: i64) -> Result<Vec<TxHash>, AppError>;

    /// May fail with [`AppError::Conflict`] when the receipt already exists.
    async fn add_receipt_data(&self, receipt: &TxReceipt) -> Result<(), AppError>;

    async fn rows_missing_prices(
        &self,
        limit: i64,
        ignored_identifiers: &[String],
    ) -> Result<Vec<MissingPriceEntry>, AppError>;

    async fn update_usd_values(&self, updates: &[(String, BigDecimal)]) -> Result<(), AppError>;
}

/// Read access to the global historical price cache.
#[async_trait]
pub trait PriceRangeStore: Send + Sync {
    async fn get_historical_price_range(
        &self,
        from_asset: &Asset,
        to_asset: &Asset,
        source: HistoricalPriceOracle,
    ) -> Result<Option<(Timestamp, Timestamp)>, AppError>;
}

#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn query_owned_assets(&self) -> Result<Vec<Asset>, AppError> {
        Ok(asset_queries::query_owned_assets(&self.pool).await?)
    }

    async fn get_main_currency(&self) -> Result<Asset, AppError> {
        let currency = asset_queries::get_main_currency(&self.pool).await?;
        Ok(currency.unwrap_or_else(|| Asset::fiat(crate::models::A_USD)))
    }

    async fn get_used_query_range(
        &self,
        name: &str,
    ) -> Result<Option<(Timestamp, Timestamp)>, AppError> {
        Ok(query_range_queries::get_used_query_range(&self.pool, name).await?)
    }

    async fn update_used_query_range(
        &self,
        name: &str,
        start_ts: Timestamp,
        end_ts: Timestamp,
    ) -> Result<(), AppError> {
        Ok(query_range_queries::update_used_query_range(&self.pool, name, start_ts, end_ts).await?)
    }

    async fn get_bitcoin_xpub_data(&self) -> Result<Vec<XpubData>, AppError> {
        Ok(account_queries::get_bitcoin_xpub_data(&self.pool).await?)
    }

    async fn get_eth_accounts(&self) -> Result<Vec<EthAddress>, AppError> {
        Ok(account_queries::get_eth_accounts(&self.pool).await?)
    }

    async fn add_ethereum_transactions(
        &self,
        transactions: &[EthTransaction],
    ) -> Result<(), AppError> {
        eth_tx_queries::add_ethereum_transactions(&self.pool, transactions).await?;
        Ok(())
    }

    async fn tx_hashes_missing_receipts(&self, limit: i64) -> Result<Vec<TxHash>, AppError> {
        Ok(eth_tx_queries::tx_hashes_missing_receipts(&self.pool, limit).await?)
    }

    async fn add_receipt_data(&self, receipt: &TxReceipt) -> Result<(), AppError> {
        Ok(eth_tx_queries::add_receipt_data(&self.pool, receipt).await?)
    }

    async fn rows_missing_prices(
        &self,
        limit: i64,
        ignored_identifiers: &[String],
    ) -> Result<Vec<MissingPriceEntry>, AppError> {
        Ok(history_event_queries::rows_missing_prices_in_base_entries(
            &self.pool,
            limit,
            ignored_identifiers,
        )
        .await?)
    }

    async fn update_usd_values(&self, updates: &[(String, BigDecimal)]) -> Result<(), AppError> {
        Ok(history_event_queries::update_usd_values(&self.pool, updates).await?)
    }
}

#[async_trait]
impl PriceRangeStore for PgTaskStore {
    async fn get_historical_price_range(
        &self,
        from_asset: &Asset,
        to_asset: &Asset,
        source: HistoricalPriceOracle,
    ) -> Result<Option<(Timestamp, Timestamp)>, AppError> {
        Ok(price_history_queries::get_historical_price_range(
            &self.pool,
            &from_asset.identifier,
            &to_asset.identifier,
            source,
        )
        .await?)
    }
}
