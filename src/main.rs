mod config;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::PgTaskStore;
use crate::external::cryptocompare::CryptocompareClient;
use crate::external::etherscan::EtherscanClient;
use crate::external::exchange::ConnectedExchanges;
use crate::logging::{init_logging, LoggingConfig};
use crate::services::clock::SystemClock;
use crate::services::job_runner::TokioJobRunner;
use crate::services::job_scheduler_service::JobSchedulerService;
use crate::services::task_manager::{TaskContext, TaskManager, DEFAULT_MAX_TASKS_NUM};
use crate::services::user_messages::MessagesAggregator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgTaskStore::new(pool.clone()));
    let cryptocompare = Arc::new(CryptocompareClient::new(
        pool.clone(),
        config.cryptocompare_api_key.clone(),
    ));
    let messages = MessagesAggregator::new();

    let ctx = TaskContext {
        job_runner: Arc::new(TokioJobRunner::new(messages.clone())),
        api_task_runner: Arc::new(TokioJobRunner::new(messages.clone())),
        store: store.clone(),
        price_ranges: store,
        price_cache: cryptocompare.clone(),
        price_historian: cryptocompare,
        ethereum: Arc::new(EtherscanClient::new(config.etherscan_api_key.clone())),
        xpub_deriver: None,
        exchange_manager: Arc::new(ConnectedExchanges::new()),
        messages: messages.clone(),
        clock: Arc::new(SystemClock),
    };

    let task_manager = Arc::new(TaskManager::new(DEFAULT_MAX_TASKS_NUM, ctx, Vec::new()));
    let mut scheduler = JobSchedulerService::new(task_manager).await?;
    scheduler.start(config.schedule_interval).await?;

    tracing::info!("🚀 Task manager running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    scheduler.stop().await?;
    for warning in messages.consume_warnings() {
        tracing::warn!("Unread warning: {}", warning);
    }
    for error in messages.consume_errors() {
        tracing::error!("Unread error: {}", error);
    }

    Ok(())
}
