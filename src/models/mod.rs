mod asset;
mod chain;
mod exchange;
mod history_event;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

pub use asset::{Asset, HistoricalPriceOracle, A_USD};
pub use chain::{EthAddress, EthTransaction, TxHash, TxReceipt, XpubData};
pub use exchange::{ExchangeHistory, ExchangeId, Location};
pub use history_event::{LedgerAction, MissingPriceEntry};
