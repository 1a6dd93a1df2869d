use bigdecimal::BigDecimal;
use sqlx::{FromRow, PgPool};

use crate::models::{Asset, MissingPriceEntry};

#[derive(Debug, FromRow)]
struct MissingPriceRow {
    identifier: String,
    amount: BigDecimal,
    timestamp: i64,
    asset_identifier: String,
    symbol: Option<String>,
    cryptocompare: Option<String>,
    is_fiat: bool,
}

/// History events whose USD value is still zero, skipping the given identifiers.
pub async fn rows_missing_prices_in_base_entries(
    pool: &PgPool,
    limit: i64,
    ignored_identifiers: &[String],
) -> Result<Vec<MissingPriceEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MissingPriceRow>(
        r#"
        SELECT e.identifier, e.amount, e.timestamp,
               a.identifier AS asset_identifier, a.symbol, a.cryptocompare, a.is_fiat
        FROM history_events e
        JOIN assets a ON a.identifier = e.asset
        WHERE e.usd_value = 0
          AND NOT (e.identifier = ANY($1))
        ORDER BY e.timestamp ASC
        LIMIT $2
        "#,
    )
    .bind(ignored_identifiers)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| MissingPriceEntry {
            identifier: row.identifier,
            amount: row.amount,
            timestamp: row.timestamp,
            asset: Asset {
                identifier: row.asset_identifier,
                symbol: row.symbol,
                cryptocompare: row.cryptocompare,
                is_fiat: row.is_fiat,
            },
        })
        .collect())
}

/// Apply staged USD values in a single transaction and bump the last write marker.
pub async fn update_usd_values(
    pool: &PgPool,
    updates: &[(String, BigDecimal)],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for (identifier, usd_value) in updates {
        sqlx::query("UPDATE history_events SET usd_value = $1 WHERE identifier = $2")
            .bind(usd_value)
            .bind(identifier)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO settings (name, value)
        VALUES ('last_write_ts', EXTRACT(EPOCH FROM NOW())::BIGINT::TEXT)
        ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
