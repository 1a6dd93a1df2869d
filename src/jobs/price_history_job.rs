use std::sync::Arc;

use crate::errors::AppError;
use crate::external::price_oracle::HistoricalPriceCache;
use crate::models::Timestamp;
use crate::services::job_runner::JobResult;
use crate::services::price_query_queue::PriceHistoryQuery;

/// Label every price history job name starts with. Used to detect a running query.
pub const CRYPTOCOMPARE_TASK_LABEL: &str = "Cryptocompare historical prices";

pub fn task_name(query: &PriceHistoryQuery) -> String {
    format!(
        "{} {} / {} query",
        CRYPTOCOMPARE_TASK_LABEL, query.from_asset, query.to_asset
    )
}

pub async fn query_and_store_historical_data(
    price_cache: Arc<dyn HistoricalPriceCache>,
    query: PriceHistoryQuery,
    timestamp: Timestamp,
) -> Result<JobResult, AppError> {
    price_cache
        .query_and_store_historical_data(&query.from_asset, &query.to_asset, timestamp)
        .await?;

    Ok(JobResult {
        items_processed: 1,
        items_failed: 0,
    })
}
