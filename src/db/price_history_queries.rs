use bigdecimal::BigDecimal;
use sqlx::PgPool;

use crate::models::{HistoricalPriceOracle, Timestamp};

/// Earliest and latest cached timestamps for a pair from one source.
pub async fn get_historical_price_range(
    pool: &PgPool,
    from_asset: &str,
    to_asset: &str,
    source: HistoricalPriceOracle,
) -> Result<Option<(Timestamp, Timestamp)>, sqlx::Error> {
    let (earliest, latest) = sqlx::query_as::<_, (Option<i64>, Option<i64>)>(
        r#"
        SELECT MIN(timestamp), MAX(timestamp)
        FROM price_history
        WHERE from_asset = $1 AND to_asset = $2 AND source_type = $3
        "#,
    )
    .bind(from_asset)
    .bind(to_asset)
    .bind(source.as_str())
    .fetch_one(pool)
    .await?;

    Ok(earliest.zip(latest))
}

/// Price at or right before `timestamp`, if cached.
pub async fn get_historical_price(
    pool: &PgPool,
    from_asset: &str,
    to_asset: &str,
    timestamp: Timestamp,
    max_seconds_distance: i64,
) -> Result<Option<BigDecimal>, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        r#"
        SELECT price FROM price_history
        WHERE from_asset = $1 AND to_asset = $2
          AND timestamp <= $3 AND timestamp >= $4
        ORDER BY timestamp DESC
        LIMIT 1
        "#,
    )
    .bind(from_asset)
    .bind(to_asset)
    .bind(timestamp)
    .bind(timestamp - max_seconds_distance)
    .fetch_optional(pool)
    .await
}

pub async fn add_historical_prices(
    pool: &PgPool,
    from_asset: &str,
    to_asset: &str,
    source: HistoricalPriceOracle,
    points: &[(Timestamp, BigDecimal)],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for (timestamp, price) in points {
        sqlx::query(
            r#"
            INSERT INTO price_history (from_asset, to_asset, source_type, timestamp, price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (from_asset, to_asset, source_type, timestamp)
            DO UPDATE SET price = EXCLUDED.price
            "#,
        )
        .bind(from_asset)
        .bind(to_asset)
        .bind(source.as_str())
        .bind(timestamp)
        .bind(price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
