//! In-memory stand-ins for the task manager's collaborators.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, OnceLock};
use tokio::sync::oneshot;

use crate::db::{PriceRangeStore, TaskStore};
use crate::errors::AppError;
use crate::external::ethereum::{EthereumClient, XpubDeriver};
use crate::external::exchange::Exchange;
use crate::external::price_oracle::{HistoricalPriceCache, PriceHistorian};
use crate::models::{
    Asset, EthAddress, EthTransaction, ExchangeHistory, HistoricalPriceOracle, Location,
    MissingPriceEntry, Timestamp, TxHash, TxReceipt, XpubData,
};
use crate::services::job_runner::{JobFuture, JobResult, JobRunner};
use crate::services::task_manager::PeriodicTask;

/// Runs `f` with temporary environment variable overrides under a global
/// lock to avoid cross-test races.
pub(crate) fn with_locked_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    static LOCK: OnceLock<StdMutex<()>> = OnceLock::new();
    let _guard = LOCK
        .get_or_init(|| StdMutex::new(()))
        .lock()
        .expect("env lock should not be poisoned");

    let previous = vars
        .iter()
        .map(|(name, _)| ((*name).to_string(), std::env::var(name).ok()))
        .collect::<Vec<_>>();

    for (name, value) in vars {
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (name, value) in previous {
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
    }

    match result {
        Ok(output) => output,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

pub fn tx(seed: u8, timestamp: Timestamp) -> EthTransaction {
    EthTransaction {
        tx_hash: TxHash(vec![seed; 32]),
        block_number: 15_000_000 + seed as i64,
        timestamp,
        from_address: "0xa".to_string(),
        to_address: Some("0xb".to_string()),
        value: "1000000000000000000".to_string(),
        gas: "21000".to_string(),
        gas_price: "20000000000".to_string(),
        gas_used: "21000".to_string(),
        input_data: "0x".to_string(),
        nonce: seed as i64,
    }
}

pub fn missing_price(identifier: &str, asset: &str, timestamp: Timestamp) -> MissingPriceEntry {
    MissingPriceEntry {
        identifier: identifier.to_string(),
        amount: BigDecimal::from(2),
        asset: Asset::new(asset),
        timestamp,
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub exception_is_error: bool,
}

/// Records submissions and keeps the jobs until a test runs them.
#[derive(Default)]
pub struct FakeRunner {
    submissions: Mutex<Vec<Submission>>,
    pending: Mutex<Vec<(String, JobFuture)>>,
    external_live: AtomicUsize,
    clear_calls: AtomicUsize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    pub fn forget_submissions(&self) {
        self.submissions.lock().clear();
    }

    /// Jobs running outside this runner's pending list, e.g. API requests.
    pub fn set_external_live(&self, count: usize) {
        self.external_live.store(count, Ordering::SeqCst);
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    /// Await every pending job in submission order.
    pub async fn run_pending(&self) -> Vec<Result<JobResult, AppError>> {
        let jobs = std::mem::take(&mut *self.pending.lock());
        let mut results = Vec::with_capacity(jobs.len());
        for (_, job) in jobs {
            results.push(job.await);
        }
        results
    }
}

impl JobRunner for FakeRunner {
    fn spawn_and_track(&self, task_name: String, exception_is_error: bool, job: JobFuture) {
        self.submissions.lock().push(Submission {
            name: task_name.clone(),
            exception_is_error,
        });
        self.pending.lock().push((task_name, job));
    }

    fn clear_finished(&self) {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn live_count(&self) -> usize {
        self.pending.lock().len() + self.external_live.load(Ordering::SeqCst)
    }

    fn task_names(&self) -> Vec<String> {
        self.pending.lock().iter().map(|(name, _)| name.clone()).collect()
    }
}

pub struct FakeStore {
    owned_assets: Mutex<Vec<Asset>>,
    main_currency: Mutex<Asset>,
    query_ranges: Mutex<HashMap<String, (Timestamp, Timestamp)>>,
    xpubs: Mutex<Vec<XpubData>>,
    eth_accounts: Mutex<Vec<EthAddress>>,
    transactions: Mutex<Vec<EthTransaction>>,
    receipts: Mutex<Vec<TxReceipt>>,
    missing_prices: Mutex<Vec<MissingPriceEntry>>,
    usd_updates: Mutex<Vec<(String, BigDecimal)>>,
    last_ignored: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            owned_assets: Mutex::new(Vec::new()),
            main_currency: Mutex::new(Asset::fiat("USD")),
            query_ranges: Mutex::new(HashMap::new()),
            xpubs: Mutex::new(Vec::new()),
            eth_accounts: Mutex::new(Vec::new()),
            transactions: Mutex::new(Vec::new()),
            receipts: Mutex::new(Vec::new()),
            missing_prices: Mutex::new(Vec::new()),
            usd_updates: Mutex::new(Vec::new()),
            last_ignored: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_owned_assets(&self, assets: Vec<Asset>) {
        *self.owned_assets.lock() = assets;
    }

    pub fn set_main_currency(&self, asset: Asset) {
        *self.main_currency.lock() = asset;
    }

    pub fn set_xpubs(&self, xpubs: Vec<XpubData>) {
        *self.xpubs.lock() = xpubs;
    }

    pub fn set_eth_accounts(&self, accounts: Vec<EthAddress>) {
        *self.eth_accounts.lock() = accounts;
    }

    pub fn add_stored_transaction(&self, transaction: EthTransaction) {
        self.transactions.lock().push(transaction);
    }

    pub fn add_stored_receipt(&self, receipt: TxReceipt) {
        self.receipts.lock().push(receipt);
    }

    pub fn set_missing_prices(&self, entries: Vec<MissingPriceEntry>) {
        *self.missing_prices.lock() = entries;
    }

    pub fn set_query_range(&self, name: &str, start: Timestamp, end: Timestamp) {
        self.query_ranges.lock().insert(name.to_string(), (start, end));
    }

    pub fn query_range(&self, name: &str) -> Option<(Timestamp, Timestamp)> {
        self.query_ranges.lock().get(name).copied()
    }

    pub fn transactions(&self) -> Vec<EthTransaction> {
        self.transactions.lock().clone()
    }

    pub fn receipts(&self) -> Vec<TxReceipt> {
        self.receipts.lock().clone()
    }

    pub fn usd_updates(&self) -> Vec<(String, BigDecimal)> {
        self.usd_updates.lock().clone()
    }

    pub fn last_ignored(&self) -> Vec<String> {
        self.last_ignored.lock().clone()
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskStore for FakeStore {
    async fn query_owned_assets(&self) -> Result<Vec<Asset>, AppError> {
        self.hit();
        Ok(self.owned_assets.lock().clone())
    }

    async fn get_main_currency(&self) -> Result<Asset, AppError> {
        self.hit();
        Ok(self.main_currency.lock().clone())
    }

    async fn get_used_query_range(
        &self,
        name: &str,
    ) -> Result<Option<(Timestamp, Timestamp)>, AppError> {
        self.hit();
        Ok(self.query_range(name))
    }

    async fn update_used_query_range(
        &self,
        name: &str,
        start_ts: Timestamp,
        end_ts: Timestamp,
    ) -> Result<(), AppError> {
        self.hit();
        self.set_query_range(name, start_ts, end_ts);
        Ok(())
    }

    async fn get_bitcoin_xpub_data(&self) -> Result<Vec<XpubData>, AppError> {
        self.hit();
        Ok(self.xpubs.lock().clone())
    }

    async fn get_eth_accounts(&self) -> Result<Vec<EthAddress>, AppError> {
        self.hit();
        Ok(self.eth_accounts.lock().clone())
    }

    async fn add_ethereum_transactions(
        &self,
        transactions: &[EthTransaction],
    ) -> Result<(), AppError> {
        self.hit();
        let mut stored = self.transactions.lock();
        for transaction in transactions {
            if !stored.iter().any(|t| t.tx_hash == transaction.tx_hash) {
                stored.push(transaction.clone());
            }
        }
        Ok(())
    }

    async fn tx_hashes_missing_receipts(&self, limit: i64) -> Result<Vec<TxHash>, AppError> {
        self.hit();
        let receipts = self.receipts.lock();
        Ok(self
            .transactions
            .lock()
            .iter()
            .filter(|t| !receipts.iter().any(|r| r.tx_hash == t.tx_hash))
            .take(limit as usize)
            .map(|t| t.tx_hash.clone())
            .collect())
    }

    async fn add_receipt_data(&self, receipt: &TxReceipt) -> Result<(), AppError> {
        self.hit();
        let mut receipts = self.receipts.lock();
        if receipts.iter().any(|r| r.tx_hash == receipt.tx_hash) {
            return Err(AppError::Conflict(format!(
                "duplicate key value violates unique constraint for {}",
                receipt.tx_hash
            )));
        }
        receipts.push(receipt.clone());
        Ok(())
    }

    async fn rows_missing_prices(
        &self,
        limit: i64,
        ignored_identifiers: &[String],
    ) -> Result<Vec<MissingPriceEntry>, AppError> {
        self.hit();
        *self.last_ignored.lock() = ignored_identifiers.to_vec();
        let updated = self.usd_updates.lock();
        Ok(self
            .missing_prices
            .lock()
            .iter()
            .filter(|e| !ignored_identifiers.contains(&e.identifier))
            .filter(|e| !updated.iter().any(|(id, _)| id == &e.identifier))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update_usd_values(&self, updates: &[(String, BigDecimal)]) -> Result<(), AppError> {
        self.hit();
        self.usd_updates.lock().extend(updates.iter().cloned());
        Ok(())
    }
}

/// Price cache ranges keyed by the from-asset identifier.
#[derive(Default)]
pub struct FakePriceRanges {
    ranges: Mutex<HashMap<String, (Timestamp, Timestamp)>>,
}

impl FakePriceRanges {
    pub fn set_range(&self, from_asset: &str, start: Timestamp, end: Timestamp) {
        self.ranges.lock().insert(from_asset.to_string(), (start, end));
    }
}

#[async_trait]
impl PriceRangeStore for FakePriceRanges {
    async fn get_historical_price_range(
        &self,
        from_asset: &Asset,
        _to_asset: &Asset,
        _source: HistoricalPriceOracle,
    ) -> Result<Option<(Timestamp, Timestamp)>, AppError> {
        Ok(self.ranges.lock().get(&from_asset.identifier).copied())
    }
}

#[derive(Default)]
pub struct FakePriceCache {
    queries: Mutex<Vec<(String, String, Timestamp)>>,
}

impl FakePriceCache {
    pub fn queries(&self) -> Vec<(String, String, Timestamp)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl HistoricalPriceCache for FakePriceCache {
    async fn query_and_store_historical_data(
        &self,
        from_asset: &Asset,
        to_asset: &Asset,
        timestamp: Timestamp,
    ) -> Result<(), AppError> {
        self.queries.lock().push((
            from_asset.identifier.clone(),
            to_asset.identifier.clone(),
            timestamp,
        ));
        Ok(())
    }
}

enum PriceOutcome {
    Price(BigDecimal),
    Remote,
    RateLimited,
    Fatal,
}

/// Unknown assets have no price at any timestamp.
#[derive(Default)]
pub struct FakeHistorian {
    outcomes: HashMap<String, PriceOutcome>,
}

impl FakeHistorian {
    pub fn with_price(mut self, asset: &str, price: i64) -> Self {
        self.outcomes
            .insert(asset.to_string(), PriceOutcome::Price(BigDecimal::from(price)));
        self
    }

    pub fn with_remote_failure(mut self, asset: &str) -> Self {
        self.outcomes.insert(asset.to_string(), PriceOutcome::Remote);
        self
    }

    pub fn with_rate_limit(mut self, asset: &str) -> Self {
        self.outcomes.insert(asset.to_string(), PriceOutcome::RateLimited);
        self
    }

    pub fn with_fatal_failure(mut self, asset: &str) -> Self {
        self.outcomes.insert(asset.to_string(), PriceOutcome::Fatal);
        self
    }
}

#[async_trait]
impl PriceHistorian for FakeHistorian {
    async fn query_historical_price(
        &self,
        from_asset: &Asset,
        _to_asset: &str,
        timestamp: Timestamp,
    ) -> Result<BigDecimal, AppError> {
        match self.outcomes.get(&from_asset.identifier) {
            Some(PriceOutcome::Price(price)) => Ok(price.clone()),
            Some(PriceOutcome::Remote) => Err(AppError::Remote("connection reset".to_string())),
            Some(PriceOutcome::RateLimited) => Err(AppError::RateLimited),
            Some(PriceOutcome::Fatal) => Err(AppError::Validation("corrupt asset".to_string())),
            None => Err(AppError::NoPriceForGivenTimestamp {
                asset: from_asset.identifier.clone(),
                timestamp,
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeEthereum {
    transactions: HashMap<EthAddress, Vec<EthTransaction>>,
    failing_receipts: Vec<TxHash>,
    queried: Mutex<Vec<(EthAddress, Timestamp, Timestamp)>>,
}

impl FakeEthereum {
    pub fn with_transactions(mut self, address: &str, transactions: Vec<EthTransaction>) -> Self {
        self.transactions.insert(address.to_string(), transactions);
        self
    }

    pub fn with_failing_receipt(mut self, tx_hash: TxHash) -> Self {
        self.failing_receipts.push(tx_hash);
        self
    }

    pub fn queried(&self) -> Vec<(EthAddress, Timestamp, Timestamp)> {
        self.queried.lock().clone()
    }
}

#[async_trait]
impl EthereumClient for FakeEthereum {
    async fn query_transactions(
        &self,
        address: &EthAddress,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<EthTransaction>, AppError> {
        self.queried.lock().push((address.clone(), start_ts, end_ts));
        Ok(self.transactions.get(address).cloned().unwrap_or_default())
    }

    async fn get_transaction_receipt(&self, tx_hash: &TxHash) -> Result<TxReceipt, AppError> {
        if self.failing_receipts.contains(tx_hash) {
            return Err(AppError::Remote(format!("receipt of {} unavailable", tx_hash)));
        }
        Ok(TxReceipt {
            tx_hash: tx_hash.clone(),
            contract_address: None,
            status: true,
            tx_type: 2,
            logs: serde_json::json!([]),
        })
    }
}

#[derive(Default)]
pub struct FakeDeriver {
    calls: AtomicUsize,
}

impl FakeDeriver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl XpubDeriver for FakeDeriver {
    async fn check_for_new_xpub_addresses(&self, xpubs: &[XpubData]) -> Result<usize, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(xpubs.len())
    }
}

pub struct FakeExchange {
    name: String,
    location: Location,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeExchange {
    pub fn new(name: &str, location: Location) -> Self {
        Self {
            name: name.to_string(),
            location,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exchange for FakeExchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> Location {
        self.location
    }

    async fn query_history(
        &self,
        _start_ts: Timestamp,
        _end_ts: Timestamp,
    ) -> Result<ExchangeHistory, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Remote("invalid API key".to_string()));
        }
        Ok(ExchangeHistory {
            trades: vec![serde_json::json!({"pair": "ETH_EUR", "amount": "1"})],
            ..ExchangeHistory::default()
        })
    }
}

enum PeriodicBehaviour {
    Ready,
    Failing,
    Blocking {
        entered: Mutex<Option<oneshot::Sender<()>>>,
        release: Mutex<Option<oneshot::Receiver<()>>>,
    },
}

pub struct FakePeriodicTask {
    name: String,
    behaviour: PeriodicBehaviour,
    invocations: AtomicUsize,
}

impl FakePeriodicTask {
    pub fn ready(name: &str) -> Self {
        Self::with_behaviour(name, PeriodicBehaviour::Ready)
    }

    pub fn failing(name: &str) -> Self {
        Self::with_behaviour(name, PeriodicBehaviour::Failing)
    }

    /// Signals `entered` when invoked, then waits for `release` before submitting nothing.
    pub fn blocking(entered: oneshot::Sender<()>, release: oneshot::Receiver<()>) -> Self {
        Self::with_behaviour(
            "blocking",
            PeriodicBehaviour::Blocking {
                entered: Mutex::new(Some(entered)),
                release: Mutex::new(Some(release)),
            },
        )
    }

    fn with_behaviour(name: &str, behaviour: PeriodicBehaviour) -> Self {
        Self {
            name: name.to_string(),
            behaviour,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeriodicTask for FakePeriodicTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn maybe_schedule(&self) -> Result<bool, AppError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            PeriodicBehaviour::Ready => Ok(true),
            PeriodicBehaviour::Failing => Err(AppError::External("premium server down".to_string())),
            PeriodicBehaviour::Blocking { entered, release } => {
                let entered = entered.lock().take();
                if let Some(entered) = entered {
                    let _ = entered.send(());
                }
                let release = release.lock().take();
                if let Some(release) = release {
                    let _ = release.await;
                }
                Ok(false)
            }
        }
    }
}
