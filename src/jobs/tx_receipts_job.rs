use std::sync::Arc;
use tracing::warn;

use crate::db::TaskStore;
use crate::errors::AppError;
use crate::external::ethereum::EthereumClient;
use crate::models::TxHash;
use crate::services::job_runner::JobResult;
use crate::services::user_messages::MessagesAggregator;

/// Fetch receipts one by one, persisting each as soon as it arrives.
///
/// A receipt that already exists is rolled back and reported to the user; the
/// rest of the batch still runs. Any other error aborts the job, keeping the
/// receipts stored so far.
pub async fn query_ethereum_txreceipts(
    ethereum: Arc<dyn EthereumClient>,
    store: Arc<dyn TaskStore>,
    messages: MessagesAggregator,
    hashes: Vec<TxHash>,
) -> Result<JobResult, AppError> {
    let mut processed = 0;
    let mut failed = 0;

    for tx_hash in hashes {
        let receipt = ethereum.get_transaction_receipt(&tx_hash).await?;
        match store.add_receipt_data(&receipt).await {
            Ok(()) => processed += 1,
            Err(AppError::Conflict(reason)) => {
                failed += 1;
                warn!("Did not add receipt of {} to the DB: {}", tx_hash, reason);
                messages.add_warning(format!(
                    "Did not add receipt of transaction {} to the DB due to it already existing",
                    tx_hash
                ));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(JobResult {
        items_processed: processed,
        items_failed: failed,
    })
}
