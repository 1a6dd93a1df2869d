use bigdecimal::BigDecimal;
use std::sync::Arc;
use tracing::error;

use crate::db::TaskStore;
use crate::errors::AppError;
use crate::external::price_oracle::PriceHistorian;
use crate::models::{MissingPriceEntry, A_USD};
use crate::services::job_runner::JobResult;
use crate::services::price_ignore_set::PriceIgnoreSet;

/// Look up USD prices for history events and write the values in one batch.
///
/// Entries whose price cannot be found go into the ignore set and are not
/// queried again during this run.
pub async fn query_missing_prices_of_base_entries(
    historian: Arc<dyn PriceHistorian>,
    store: Arc<dyn TaskStore>,
    ignore_set: PriceIgnoreSet,
    entries: Vec<MissingPriceEntry>,
) -> Result<JobResult, AppError> {
    let mut updates: Vec<(String, BigDecimal)> = Vec::with_capacity(entries.len());
    let mut failed = 0;

    for entry in entries {
        let price = match historian
            .query_historical_price(&entry.asset, A_USD, entry.timestamp)
            .await
        {
            Ok(price) => price,
            Err(e) if e.is_price_lookup_failure() => {
                error!(
                    "Failed to find price for {} at {} in base entry {}. {}.",
                    entry.asset, entry.timestamp, entry.identifier, e
                );
                ignore_set.add(&entry.identifier);
                failed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        updates.push((entry.identifier, &entry.amount * &price));
    }

    store.update_usd_values(&updates).await?;

    Ok(JobResult {
        items_processed: updates.len() as i32,
        items_failed: failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{missing_price, FakeHistorian, FakeStore};

    #[tokio::test]
    async fn test_failed_lookups_are_ignored_and_rest_batched() {
        let historian = Arc::new(
            FakeHistorian::default()
                .with_price("ETH", 2000)
                .with_remote_failure("BTC"),
        );
        let store = Arc::new(FakeStore::new());
        let ignore_set = PriceIgnoreSet::new();
        let entries = vec![
            missing_price("evt-eth", "ETH", 1_600_000_000),
            missing_price("evt-btc", "BTC", 1_600_000_000),
            missing_price("evt-dust", "DUST", 1_600_000_000),
        ];

        let result = query_missing_prices_of_base_entries(
            historian,
            store.clone(),
            ignore_set.clone(),
            entries,
        )
        .await
        .unwrap();

        assert_eq!(result.items_processed, 1);
        assert_eq!(result.items_failed, 2);
        assert_eq!(
            store.usd_updates(),
            vec![("evt-eth".to_string(), BigDecimal::from(4000))]
        );
        assert!(ignore_set.contains("evt-btc"));
        assert!(ignore_set.contains("evt-dust"));
        assert!(!ignore_set.contains("evt-eth"));
    }

    #[tokio::test]
    async fn test_unexpected_error_aborts_batch() {
        let historian = Arc::new(
            FakeHistorian::default()
                .with_price("ETH", 2000)
                .with_fatal_failure("BAD"),
        );
        let store = Arc::new(FakeStore::new());
        let ignore_set = PriceIgnoreSet::new();

        let result = query_missing_prices_of_base_entries(
            historian,
            store.clone(),
            ignore_set.clone(),
            vec![
                missing_price("evt-eth", "ETH", 1_600_000_000),
                missing_price("evt-bad", "BAD", 1_600_000_000),
            ],
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.usd_updates().is_empty());
        assert!(ignore_set.to_vec().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_aborts_without_ignoring() {
        let historian = Arc::new(
            FakeHistorian::default()
                .with_price("ETH", 2000)
                .with_rate_limit("BTC"),
        );
        let store = Arc::new(FakeStore::new());
        let ignore_set = PriceIgnoreSet::new();

        let result = query_missing_prices_of_base_entries(
            historian,
            store.clone(),
            ignore_set.clone(),
            vec![
                missing_price("evt-eth", "ETH", 1_600_000_000),
                missing_price("evt-btc", "BTC", 1_600_000_000),
            ],
        )
        .await;

        assert!(matches!(result, Err(AppError::RateLimited)));
        assert!(store.usd_updates().is_empty());
        assert!(!ignore_set.contains("evt-btc"));
    }
}
