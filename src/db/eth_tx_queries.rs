use sqlx::PgPool;
use tracing::debug;

use crate::models::{EthTransaction, TxHash, TxReceipt};

/// Store fetched transactions, ignoring ones already present.
pub async fn add_ethereum_transactions(
    pool: &PgPool,
    transactions: &[EthTransaction],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for t in transactions {
        let result = sqlx::query(
            r#"
            INSERT INTO ethereum_transactions (
                tx_hash, timestamp, block_number, from_address, to_address,
                value, gas, gas_price, gas_used, input_data, nonce
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (tx_hash) DO NOTHING
            "#,
        )
        .bind(&t.tx_hash.0)
        .bind(t.timestamp)
        .bind(t.block_number)
        .bind(&t.from_address)
        .bind(&t.to_address)
        .bind(&t.value)
        .bind(&t.gas)
        .bind(&t.gas_price)
        .bind(&t.gas_used)
        .bind(&t.input_data)
        .bind(t.nonce)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    debug!("Stored {} new ethereum transactions", inserted);
    Ok(inserted)
}

/// Hashes of stored transactions that have no receipt yet.
pub async fn tx_hashes_missing_receipts(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<TxHash>, sqlx::Error> {
    let hashes = sqlx::query_scalar::<_, Vec<u8>>(
        r#"
        SELECT tx_hash FROM ethereum_transactions
        WHERE tx_hash NOT IN (SELECT tx_hash FROM ethtx_receipts)
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(hashes.into_iter().map(TxHash).collect())
}

/// Insert one receipt in its own transaction.
///
/// A duplicate receipt surfaces as a unique violation; the transaction is
/// rolled back when it is dropped without commit.
pub async fn add_receipt_data(pool: &PgPool, receipt: &TxReceipt) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO ethtx_receipts (tx_hash, contract_address, status, type, logs)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&receipt.tx_hash.0)
    .bind(&receipt.contract_address)
    .bind(receipt.status)
    .bind(receipt.tx_type)
    .bind(&receipt.logs)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
