//! One-shot discovery of price history pairs.
//!
//! Runs once when the task manager is created. Classifying every owned asset
//! against the price cache is too slow for a scheduling pass, so the result is
//! left in a [`PriceQueryQueue`] that the price history task drains later.

use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{PriceRangeStore, TaskStore};
use crate::errors::AppError;
use crate::models::{HistoricalPriceOracle, Timestamp};
use crate::services::job_runner::JobResult;
use crate::services::price_query_queue::{PriceHistoryQuery, PriceQueryQueue};

/// Cached hourly prices newer than this are considered fresh.
pub const CRYPTOCOMPARE_QUERY_AFTER_SECS: i64 = 86400;

pub async fn prepare_cryptocompare_queries(
    queue: Arc<PriceQueryQueue>,
    store: Arc<dyn TaskStore>,
    price_ranges: Arc<dyn PriceRangeStore>,
    now: Timestamp,
) -> Result<JobResult, AppError> {
    if queue.is_prepared() || !queue.is_empty() {
        return Ok(JobResult::default());
    }

    let assets = store.query_owned_assets().await?;
    let main_currency = store.get_main_currency().await?;
    let mut skipped = 0;

    for asset in assets {
        if asset.is_fiat() && main_currency.is_fiat() {
            skipped += 1;
            continue; // fiat to fiat is never fetched
        }

        if asset.is_unsupported_by_cryptocompare() || main_currency.is_unsupported_by_cryptocompare() {
            skipped += 1;
            continue;
        }

        if asset.cryptocompare.is_none() && asset.symbol.is_none() {
            skipped += 1;
            continue;
        }

        let data_range = price_ranges
            .get_historical_price_range(&asset, &main_currency, HistoricalPriceOracle::Cryptocompare)
            .await?;
        if let Some((_, latest)) = data_range {
            if now - latest < CRYPTOCOMPARE_QUERY_AFTER_SECS {
                debug!("Price history of {} is fresh, skipping", asset);
                skipped += 1;
                continue;
            }
        }

        queue.insert(PriceHistoryQuery {
            from_asset: asset,
            to_asset: main_currency.clone(),
        });
    }

    queue.mark_prepared();
    info!("Prepared {} price history queries ({} assets skipped)", queue.len(), skipped);

    Ok(JobResult {
        items_processed: queue.len() as i32,
        items_failed: 0,
    })
}
