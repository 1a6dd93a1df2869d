//! Background task manager.
//!
//! A periodic timer calls [`TaskManager::schedule`]. Each pass checks how many
//! jobs are already running against `max_tasks_num`, samples that many task
//! kinds uniformly at random without replacement, and lets each sampled kind
//! decide whether it has work to submit right now.
//!
//! Sampling gives every kind the same chance per pass, so over many passes
//! none starves, but fairness is probabilistic rather than round-robin.

use async_trait::async_trait;
use futures::FutureExt;
use rand::seq::IndexedRandom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::db::{PriceRangeStore, TaskStore};
use crate::errors::AppError;
use crate::external::ethereum::{EthereumClient, XpubDeriver};
use crate::external::exchange::{Exchange, ExchangeManager};
use crate::external::price_oracle::{HistoricalPriceCache, PriceHistorian};
use crate::jobs::{
    eth_transactions_job, exchange_history_job, missing_prices_job, prepare_price_queries_job,
    price_history_job, tx_receipts_job, xpub_derivation_job,
};
use crate::models::{EthAddress, MissingPriceEntry};
use crate::services::clock::Clock;
use crate::services::job_runner::JobRunner;
use crate::services::price_ignore_set::PriceIgnoreSet;
use crate::services::price_query_queue::PriceQueryQueue;
use crate::services::rate_gate::{RateGate, RateKey};
use crate::services::user_messages::MessagesAggregator;

pub const DEFAULT_MAX_TASKS_NUM: usize = 2;
/// At least 4 minutes between two price history queries.
pub const CRYPTOCOMPARE_HISTOHOUR_FREQUENCY: i64 = 240;
pub const XPUB_DERIVATION_FREQUENCY: i64 = 3600;
pub const ETH_TX_QUERY_FREQUENCY: i64 = 3600;
pub const EXCHANGE_QUERY_FREQUENCY: i64 = 3600;
pub const TX_RECEIPTS_QUERY_LIMIT: i64 = 100;
pub const MISSING_PRICES_QUERY_LIMIT: i64 = 100;

/// One entry of the fixed task catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    PriceHistoryQuery,
    XpubDerivation,
    EthTransactionQuery,
    EthTxReceipts,
    ExchangeHistoryQuery,
    MissingPrices,
    /// Index into the externally supplied tasks.
    Extra(usize),
}

/// A task owned by another component that wants a slot in the rotation.
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    fn name(&self) -> &str;

    /// Submit work if there is any. Returns whether something was submitted.
    async fn maybe_schedule(&self) -> Result<bool, AppError>;
}

/// Collaborators the task manager schedules work for.
#[derive(Clone)]
pub struct TaskContext {
    pub job_runner: Arc<dyn JobRunner>,
    /// Jobs started by request handlers; they count against the same limit.
    pub api_task_runner: Arc<dyn JobRunner>,
    pub store: Arc<dyn TaskStore>,
    pub price_ranges: Arc<dyn PriceRangeStore>,
    pub price_cache: Arc<dyn HistoricalPriceCache>,
    pub price_historian: Arc<dyn PriceHistorian>,
    pub ethereum: Arc<dyn EthereumClient>,
    /// When `None` the xpub derivation kind is left out of the catalogue.
    pub xpub_deriver: Option<Arc<dyn XpubDeriver>>,
    /// Exchanges may be connected at any time, so the exchange history kind
    /// always stays in the catalogue and is simply never ready while none are.
    pub exchange_manager: Arc<dyn ExchangeManager>,
    pub messages: MessagesAggregator,
    pub clock: Arc<dyn Clock>,
}

/// Outcome of one scheduling pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub capacity: usize,
    pub sampled: usize,
    pub submitted: usize,
}

pub struct TaskManager {
    max_tasks_num: usize,
    ctx: TaskContext,
    extra_tasks: Vec<Arc<dyn PeriodicTask>>,
    potential_tasks: Vec<TaskKind>,
    price_queries: Arc<PriceQueryQueue>,
    rate_gate: RateGate<RateKey>,
    ignore_set: PriceIgnoreSet,
    schedule_lock: Mutex<()>,
    stopped: AtomicBool,
}

impl TaskManager {
    /// Build the task manager and kick off the one-shot price pair discovery.
    pub fn new(
        max_tasks_num: usize,
        ctx: TaskContext,
        extra_tasks: Vec<Arc<dyn PeriodicTask>>,
    ) -> Self {
        let price_queries = Arc::new(PriceQueryQueue::new());

        ctx.job_runner.spawn_and_track(
            "Prepare cryptocompare queries".to_string(),
            true,
            prepare_price_queries_job::prepare_cryptocompare_queries(
                price_queries.clone(),
                ctx.store.clone(),
                ctx.price_ranges.clone(),
                ctx.clock.now(),
            )
            .boxed(),
        );

        let mut potential_tasks = vec![TaskKind::PriceHistoryQuery];
        // Without a deriver the xpub task could never submit
        if ctx.xpub_deriver.is_some() {
            potential_tasks.push(TaskKind::XpubDerivation);
        }
        potential_tasks.extend([
            TaskKind::EthTransactionQuery,
            TaskKind::ExchangeHistoryQuery,
            TaskKind::EthTxReceipts,
            TaskKind::MissingPrices,
        ]);
        potential_tasks.extend((0..extra_tasks.len()).map(TaskKind::Extra));

        Self {
            max_tasks_num,
            ctx,
            extra_tasks,
            potential_tasks,
            price_queries,
            rate_gate: RateGate::new(),
            ignore_set: PriceIgnoreSet::new(),
            schedule_lock: Mutex::new(()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Run one scheduling pass while holding the scheduling lock.
    ///
    /// Once [`TaskManager::stop_scheduling`] went through, this does nothing.
    pub async fn schedule(&self) {
        let _guard = self.schedule_lock.lock().await;
        if self.stopped.load(Ordering::SeqCst) {
            debug!("Task manager stopped, not scheduling");
            return;
        }
        self.run_pass().await;
    }

    /// Wait for any in-flight pass and hold off new ones while the guard lives.
    pub async fn lock_scheduling(&self) -> MutexGuard<'_, ()> {
        self.schedule_lock.lock().await
    }

    /// Used on logout: waits for an in-flight pass, then refuses further passes.
    pub async fn stop_scheduling(&self) {
        let _guard = self.lock_scheduling().await;
        self.stopped.store(true, Ordering::SeqCst);
        info!("🛑 Task scheduling stopped");
    }

    /// One admission-controlled pass. Callers should hold the scheduling lock.
    pub async fn run_pass(&self) -> PassReport {
        self.ctx.job_runner.clear_finished();
        let current_tasks = self.ctx.job_runner.live_count() + self.ctx.api_task_runner.live_count();
        let not_proceed = current_tasks >= self.max_tasks_num;
        debug!(
            "At task scheduling. Current tasks: {} Max tasks: {}. {}.",
            current_tasks,
            self.max_tasks_num,
            if not_proceed { "Will not schedule" } else { "Will schedule" }
        );
        if not_proceed {
            return PassReport::default();
        }

        let capacity = self.max_tasks_num - current_tasks;
        let selected = sample_tasks(&self.potential_tasks, capacity);

        let mut submitted = 0;
        for task in &selected {
            match self.maybe_schedule(*task).await {
                Ok(true) => submitted += 1,
                Ok(false) => {}
                Err(e) => warn!("Could not check readiness of {:?}: {}", task, e),
            }
        }

        PassReport {
            capacity,
            sampled: selected.len(),
            submitted,
        }
    }

    async fn maybe_schedule(&self, task: TaskKind) -> Result<bool, AppError> {
        match task {
            TaskKind::PriceHistoryQuery => self.maybe_schedule_cryptocompare_query().await,
            TaskKind::XpubDerivation => self.maybe_schedule_xpub_derivation().await,
            TaskKind::EthTransactionQuery => self.maybe_query_ethereum_transactions().await,
            TaskKind::EthTxReceipts => self.maybe_schedule_ethereum_txreceipts().await,
            TaskKind::ExchangeHistoryQuery => self.maybe_schedule_exchange_history_query().await,
            TaskKind::MissingPrices => self.maybe_query_missing_prices().await,
            TaskKind::Extra(index) => match self.extra_tasks.get(index) {
                Some(extra) => {
                    debug!("Checking periodic task {}", extra.name());
                    extra.maybe_schedule().await
                }
                None => Ok(false),
            },
        }
    }

    /// Schedules a price history query for a single pair.
    async fn maybe_schedule_cryptocompare_query(&self) -> Result<bool, AppError> {
        if !self.price_queries.is_prepared() || self.price_queries.is_empty() {
            return Ok(false);
        }

        let already_running = self
            .ctx
            .job_runner
            .task_names()
            .iter()
            .any(|name| name.contains(price_history_job::CRYPTOCOMPARE_TASK_LABEL));
        if already_running {
            return Ok(false);
        }

        let now = self.ctx.clock.now();
        if !self
            .rate_gate
            .is_ready(&RateKey::PriceHistory, CRYPTOCOMPARE_HISTOHOUR_FREQUENCY, now)
        {
            return Ok(false);
        }

        let Some(query) = self.price_queries.pop() else {
            return Ok(false);
        };
        let task_name = price_history_job::task_name(&query);
        debug!("Scheduling task for {}", task_name);
        self.ctx.job_runner.spawn_and_track(
            task_name,
            false,
            price_history_job::query_and_store_historical_data(
                self.ctx.price_cache.clone(),
                query,
                now,
            )
            .boxed(),
        );
        self.rate_gate.record_attempt(RateKey::PriceHistory, now);
        Ok(true)
    }

    async fn maybe_schedule_xpub_derivation(&self) -> Result<bool, AppError> {
        let now = self.ctx.clock.now();
        if !self
            .rate_gate
            .is_ready(&RateKey::XpubDerivation, XPUB_DERIVATION_FREQUENCY, now)
        {
            return Ok(false);
        }

        let Some(deriver) = self.ctx.xpub_deriver.clone() else {
            return Ok(false);
        };

        let xpubs = self.ctx.store.get_bitcoin_xpub_data().await?;
        if xpubs.is_empty() {
            return Ok(false);
        }

        debug!("Scheduling task for Xpub derivation");
        self.ctx.job_runner.spawn_and_track(
            "Derive new xpub addresses".to_string(),
            true,
            xpub_derivation_job::check_for_new_xpub_addresses(deriver, xpubs).boxed(),
        );
        self.rate_gate.record_attempt(RateKey::XpubDerivation, now);
        Ok(true)
    }

    async fn maybe_query_ethereum_transactions(&self) -> Result<bool, AppError> {
        let accounts = self.ctx.store.get_eth_accounts().await?;
        if accounts.is_empty() {
            return Ok(false);
        }

        let now = self.ctx.clock.now();
        let mut queriable_accounts: Vec<EthAddress> = Vec::new();
        for address in accounts {
            let queried_range = self
                .ctx
                .store
                .get_used_query_range(&eth_transactions_job::query_range_name(&address))
                .await?;
            let end_ts = queried_range.map(|(_, end)| end).unwrap_or(0);
            let key = RateKey::EthAddress(address.clone());
            if self
                .rate_gate
                .is_ready_with_checkpoint(&key, end_ts, ETH_TX_QUERY_FREQUENCY, now)
            {
                queriable_accounts.push(address);
            }
        }

        let Some(address) = pick_random(&queriable_accounts) else {
            return Ok(false);
        };

        let task_name = format!("Query ethereum transactions for {}", address);
        debug!("Scheduling task to {}", task_name);
        self.ctx.job_runner.spawn_and_track(
            task_name,
            true,
            eth_transactions_job::single_address_query_transactions(
                self.ctx.ethereum.clone(),
                self.ctx.store.clone(),
                address.clone(),
                0,
                now,
            )
            .boxed(),
        );
        self.rate_gate.record_attempt(RateKey::EthAddress(address), now);
        Ok(true)
    }

    async fn maybe_schedule_ethereum_txreceipts(&self) -> Result<bool, AppError> {
        let hashes = self
            .ctx
            .store
            .tx_hashes_missing_receipts(TX_RECEIPTS_QUERY_LIMIT)
            .await?;
        if hashes.is_empty() {
            return Ok(false);
        }

        let task_name = format!("Query {} ethereum transactions receipts", hashes.len());
        debug!("Scheduling task to {}", task_name);
        self.ctx.job_runner.spawn_and_track(
            task_name,
            true,
            tx_receipts_job::query_ethereum_txreceipts(
                self.ctx.ethereum.clone(),
                self.ctx.store.clone(),
                self.ctx.messages.clone(),
                hashes,
            )
            .boxed(),
        );
        Ok(true)
    }

    async fn maybe_schedule_exchange_history_query(&self) -> Result<bool, AppError> {
        let exchanges = self.ctx.exchange_manager.connected_exchanges();
        if exchanges.is_empty() {
            return Ok(false);
        }

        let now = self.ctx.clock.now();
        let mut queriable_exchanges: Vec<Arc<dyn Exchange>> = Vec::new();
        for exchange in exchanges {
            if exchange.location().has_dedicated_history_sync() {
                continue;
            }
            let queried_range = self
                .ctx
                .store
                .get_used_query_range(&exchange_history_job::query_range_name(exchange.location()))
                .await?;
            let end_ts = queried_range.map(|(_, end)| end).unwrap_or(0);
            let key = RateKey::Exchange(exchange.location_id());
            if self
                .rate_gate
                .is_ready_with_checkpoint(&key, end_ts, EXCHANGE_QUERY_FREQUENCY, now)
            {
                queriable_exchanges.push(exchange);
            }
        }

        let Some(exchange) = pick_random(&queriable_exchanges) else {
            return Ok(false);
        };

        let task_name = format!("Query history of {} exchange", exchange.name());
        debug!("Scheduling task to {}", task_name);
        let key = RateKey::Exchange(exchange.location_id());
        self.ctx.job_runner.spawn_and_track(
            task_name,
            true,
            exchange_history_job::query_history_with_callbacks(
                exchange,
                self.ctx.store.clone(),
                0,
                now,
                exchange_history_job::noop_exchange_success_cb,
                exchange_history_job::exchange_fail_cb,
            )
            .boxed(),
        );
        self.rate_gate.record_attempt(key, now);
        Ok(true)
    }

    async fn maybe_query_missing_prices(&self) -> Result<bool, AppError> {
        let entries = self
            .get_base_entries_missing_prices(MISSING_PRICES_QUERY_LIMIT)
            .await?;
        if entries.is_empty() {
            return Ok(false);
        }

        let task_name = "Periodically query history events prices".to_string();
        debug!("Scheduling task to {}", task_name);
        self.ctx.job_runner.spawn_and_track(
            task_name,
            true,
            missing_prices_job::query_missing_prices_of_base_entries(
                self.ctx.price_historian.clone(),
                self.ctx.store.clone(),
                self.ignore_set.clone(),
                entries,
            )
            .boxed(),
        );
        Ok(true)
    }

    /// History events missing USD prices that were not already tried this run.
    pub async fn get_base_entries_missing_prices(
        &self,
        limit: i64,
    ) -> Result<Vec<MissingPriceEntry>, AppError> {
        let ignored = self.ignore_set.to_vec();
        self.ctx.store.rows_missing_prices(limit, &ignored).await
    }
}

/// Uniform sample without replacement of up to `amount` task kinds.
fn sample_tasks(catalogue: &[TaskKind], amount: usize) -> Vec<TaskKind> {
    let mut rng = rand::rng();
    catalogue
        .choose_multiple(&mut rng, amount.min(catalogue.len()))
        .copied()
        .collect()
}

fn pick_random<T: Clone>(items: &[T]) -> Option<T> {
    items.choose(&mut rand::rng()).cloned()
}
