use async_trait::async_trait;
use bigdecimal::{BigDecimal, FromPrimitive, Zero};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::db::price_history_queries;
use crate::errors::AppError;
use crate::external::price_oracle::{HistoricalPriceCache, PriceHistorian, PriceProviderError};
use crate::models::{Asset, HistoricalPriceOracle, Timestamp};

const BASE_URL: &str = "https://min-api.cryptocompare.com/data";
const HISTOHOUR_LIMIT: u32 = 2000;
/// Cached prices older than this are not trusted for a given timestamp.
const CACHED_PRICE_MAX_DISTANCE_SECS: i64 = 3600;

pub struct CryptocompareClient {
    client: reqwest::Client,
    api_key: Option<String>,
    pool: PgPool,
}

impl CryptocompareClient {
    pub fn new(pool: PgPool, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            pool,
        }
    }

    fn symbol(asset: &Asset) -> Result<&str, PriceProviderError> {
        asset
            .cryptocompare_symbol()
            .ok_or_else(|| PriceProviderError::Unsupported(asset.identifier.clone()))
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PriceProviderError> {
        let mut request = self.client.get(format!("{}/{}", BASE_URL, path)).query(query);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceProviderError::RateLimited);
        }

        resp.json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct HistohourResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Data")]
    data: Option<HistohourData>,
}

#[derive(Debug, Deserialize)]
struct HistohourData {
    #[serde(rename = "Data", default)]
    data: Vec<HistohourEntry>,
}

#[derive(Debug, Deserialize)]
struct HistohourEntry {
    time: i64,
    close: f64,
}

fn check_response(response: &str, message: &str) -> Result<(), PriceProviderError> {
    if response == "Success" {
        return Ok(());
    }
    if message.contains("rate limit") {
        return Err(PriceProviderError::RateLimited);
    }
    Err(PriceProviderError::BadResponse(message.to_string()))
}

#[async_trait]
impl HistoricalPriceCache for CryptocompareClient {
    async fn query_and_store_historical_data(
        &self,
        from_asset: &Asset,
        to_asset: &Asset,
        timestamp: Timestamp,
    ) -> Result<(), AppError> {
        let fsym = Self::symbol(from_asset)?;
        let tsym = Self::symbol(to_asset)?;

        let body: HistohourResponse = self
            .get(
                "v2/histohour",
                &[
                    ("fsym", fsym.to_string()),
                    ("tsym", tsym.to_string()),
                    ("limit", HISTOHOUR_LIMIT.to_string()),
                    ("toTs", timestamp.to_string()),
                ],
            )
            .await?;
        check_response(&body.response, &body.message)?;

        let points: Vec<(Timestamp, BigDecimal)> = body
            .data
            .map(|d| d.data)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| BigDecimal::from_f64(entry.close).map(|price| (entry.time, price)))
            .filter(|(_, price)| !price.is_zero())
            .collect();

        price_history_queries::add_historical_prices(
            &self.pool,
            &from_asset.identifier,
            &to_asset.identifier,
            HistoricalPriceOracle::Cryptocompare,
            &points,
        )
        .await?;

        info!(
            "Stored {} hourly prices for {} / {}",
            points.len(),
            from_asset,
            to_asset
        );
        Ok(())
    }
}

#[async_trait]
impl PriceHistorian for CryptocompareClient {
    async fn query_historical_price(
        &self,
        from_asset: &Asset,
        to_asset: &str,
        timestamp: Timestamp,
    ) -> Result<BigDecimal, AppError> {
        if let Some(price) = price_history_queries::get_historical_price(
            &self.pool,
            &from_asset.identifier,
            to_asset,
            timestamp,
            CACHED_PRICE_MAX_DISTANCE_SECS,
        )
        .await?
        {
            debug!("Using cached price of {} at {}", from_asset, timestamp);
            return Ok(price);
        }

        let fsym = Self::symbol(from_asset)?;
        let body: HashMap<String, HashMap<String, f64>> = self
            .get(
                "pricehistorical",
                &[
                    ("fsym", fsym.to_string()),
                    ("tsyms", to_asset.to_string()),
                    ("ts", timestamp.to_string()),
                ],
            )
            .await?;

        body.get(fsym)
            .and_then(|prices| prices.get(to_asset))
            .and_then(|price| BigDecimal::from_f64(*price))
            .filter(|price| !price.is_zero())
            .ok_or_else(|| AppError::NoPriceForGivenTimestamp {
                asset: from_asset.identifier.clone(),
                timestamp,
            })
    }
}
