use sqlx::PgPool;

use crate::models::Asset;

/// Assets the user currently holds, joined with their registry metadata.
pub async fn query_owned_assets(pool: &PgPool) -> Result<Vec<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(
        r#"
        SELECT a.identifier, a.symbol, a.cryptocompare, a.is_fiat
        FROM owned_assets o
        JOIN assets a ON a.identifier = o.asset
        ORDER BY a.identifier
        "#,
    )
    .fetch_all(pool)
    .await
}

/// The main currency from the settings table, if one was chosen.
pub async fn get_main_currency(pool: &PgPool) -> Result<Option<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(
        r#"
        SELECT a.identifier, a.symbol, a.cryptocompare, a.is_fiat
        FROM settings s
        JOIN assets a ON a.identifier = s.value
        WHERE s.name = 'main_currency'
        "#,
    )
    .fetch_optional(pool)
    .await
}
