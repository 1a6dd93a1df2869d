//! Background Jobs Module
//!
//! Bodies of the jobs the task manager submits to the job runner. Each
//! function owns everything it touches (cloned `Arc` handles and owned
//! arguments) so it can run as a detached task, and writes its own
//! completion state such as sync checkpoints or ignore-set entries.
//!
//! # Available Jobs
//!
//! - `prepare_price_queries_job` - One-shot discovery of price pairs to backfill
//! - `price_history_job` - Hourly price history for a single pair
//! - `xpub_derivation_job` - New address discovery for registered xpubs
//! - `eth_transactions_job` - Transaction sync for one ethereum address
//! - `tx_receipts_job` - Receipt backfill for stored transactions
//! - `exchange_history_job` - Full history sync of one exchange
//! - `missing_prices_job` - USD value backfill for history events

pub mod eth_transactions_job;
pub mod exchange_history_job;
pub mod missing_prices_job;
pub mod prepare_price_queries_job;
pub mod price_history_job;
pub mod tx_receipts_job;
pub mod xpub_derivation_job;
