use std::sync::Arc;
use tracing::info;

use crate::db::TaskStore;
use crate::errors::AppError;
use crate::external::ethereum::EthereumClient;
use crate::models::{EthAddress, Timestamp};
use crate::services::job_runner::JobResult;

/// Name of the checkpoint range covering synced transactions of `address`.
pub fn query_range_name(address: &EthAddress) -> String {
    format!("ethtxs_{}", address)
}

/// Fetch and store the transactions of one address, then advance its checkpoint.
pub async fn single_address_query_transactions(
    ethereum: Arc<dyn EthereumClient>,
    store: Arc<dyn TaskStore>,
    address: EthAddress,
    start_ts: Timestamp,
    end_ts: Timestamp,
) -> Result<JobResult, AppError> {
    let transactions = ethereum.query_transactions(&address, start_ts, end_ts).await?;
    store.add_ethereum_transactions(&transactions).await?;
    store
        .update_used_query_range(&query_range_name(&address), start_ts, end_ts)
        .await?;

    info!("Synced {} transactions for {}", transactions.len(), address);
    Ok(JobResult {
        items_processed: transactions.len() as i32,
        items_failed: 0,
    })
}
