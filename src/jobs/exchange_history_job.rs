use std::sync::Arc;
use tracing::{error, info};

use crate::db::TaskStore;
use crate::errors::AppError;
use crate::external::exchange::Exchange;
use crate::models::{ExchangeHistory, Location, Timestamp};
use crate::services::job_runner::JobResult;

pub type SuccessCallback = fn(&ExchangeHistory);
pub type FailCallback = fn(&str);

/// Success hook for scheduled history syncs. Nothing consumes the result yet.
pub fn noop_exchange_success_cb(_history: &ExchangeHistory) {}

pub fn exchange_fail_cb(error: &str) {
    error!("{}", error);
}

pub fn query_range_name(location: Location) -> String {
    format!("{}_trades", location)
}

/// Query the full history of one exchange and report through the callbacks.
///
/// A failed query is handed to `fail_callback` and does not fail the job.
pub async fn query_history_with_callbacks(
    exchange: Arc<dyn Exchange>,
    store: Arc<dyn TaskStore>,
    start_ts: Timestamp,
    end_ts: Timestamp,
    success_callback: SuccessCallback,
    fail_callback: FailCallback,
) -> Result<JobResult, AppError> {
    match exchange.query_history(start_ts, end_ts).await {
        Ok(history) => {
            store
                .update_used_query_range(&query_range_name(exchange.location()), start_ts, end_ts)
                .await?;
            info!(
                "Queried history of {} exchange: {} trades, {} asset movements",
                exchange.name(),
                history.trades.len(),
                history.asset_movements.len()
            );
            success_callback(&history);
            Ok(JobResult {
                items_processed: history.trades.len() as i32,
                items_failed: 0,
            })
        }
        Err(e) => {
            fail_callback(&format!(
                "Failed to query history of {} exchange: {}",
                exchange.name(),
                e
            ));
            Ok(JobResult {
                items_processed: 0,
                items_failed: 1,
            })
        }
    }
}
