use sqlx::PgPool;

use crate::models::Timestamp;

/// Get the `(start_ts, end_ts)` range already synced under `name`.
pub async fn get_used_query_range(
    pool: &PgPool,
    name: &str,
) -> Result<Option<(Timestamp, Timestamp)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT start_ts, end_ts FROM used_query_ranges WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Insert or replace the synced range for `name`.
pub async fn update_used_query_range(
    pool: &PgPool,
    name: &str,
    start_ts: Timestamp,
    end_ts: Timestamp,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO used_query_ranges (name, start_ts, end_ts)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE
        SET start_ts = EXCLUDED.start_ts, end_ts = EXCLUDED.end_ts
        "#,
    )
    .bind(name)
    .bind(start_ts)
    .bind(end_ts)
    .execute(pool)
    .await?;

    Ok(())
}
