use std::time::Duration;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// Period of the scheduling timer.
    pub schedule_interval: Duration,
    pub cryptocompare_api_key: Option<String>,
    pub etherscan_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::Validation("DATABASE_URL must be set".to_string()))?;

        let schedule_interval_secs: u64 = parse_or_default("SCHEDULE_INTERVAL_SECS", 5)?;
        if schedule_interval_secs == 0 {
            return Err(AppError::Validation(
                "SCHEDULE_INTERVAL_SECS must be positive".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            db_max_connections: parse_or_default("DB_MAX_CONNECTIONS", 10)?,
            schedule_interval: Duration::from_secs(schedule_interval_secs),
            cryptocompare_api_key: non_empty_var("CRYPTOCOMPARE_API_KEY"),
            etherscan_api_key: non_empty_var("ETHERSCAN_API_KEY"),
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid {}: {}", name, value))),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
