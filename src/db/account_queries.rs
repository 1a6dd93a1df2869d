use sqlx::PgPool;

use crate::models::{EthAddress, XpubData};

pub async fn get_eth_accounts(pool: &PgPool) -> Result<Vec<EthAddress>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT account FROM blockchain_accounts WHERE blockchain = 'ETH' ORDER BY account",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_bitcoin_xpub_data(pool: &PgPool) -> Result<Vec<XpubData>, sqlx::Error> {
    sqlx::query_as::<_, XpubData>(
        r#"
        SELECT xpub, NULLIF(derivation_path, '') AS derivation_path, label
        FROM xpubs
        ORDER BY xpub, derivation_path
        "#,
    )
    .fetch_all(pool)
    .await
}
