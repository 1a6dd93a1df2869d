use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{EthAddress, EthTransaction, TxHash, TxReceipt, XpubData};

#[async_trait]
pub trait EthereumClient: Send + Sync {
    /// Transactions touching `address` with `start_ts <= timestamp < end_ts`.
    async fn query_transactions(
        &self,
        address: &EthAddress,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<EthTransaction>, AppError>;

    async fn get_transaction_receipt(&self, tx_hash: &TxHash) -> Result<TxReceipt, AppError>;
}

/// Derives fresh addresses from registered xpubs and starts tracking the used ones.
#[async_trait]
pub trait XpubDeriver: Send + Sync {
    /// Returns how many new addresses were added.
    async fn check_for_new_xpub_addresses(&self, xpubs: &[XpubData]) -> Result<usize, AppError>;
}
