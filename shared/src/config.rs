use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use dotenv::dotenv;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::database::is_valid_identifier;
use crate::models::Timeframe;

/// Process configuration, shared by the ingest job and the API server.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub candle_table: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// First timestamp (ms) the ingest job asks the exchange for
    pub sync_start_ms: i64,
    pub sync_page_size: u32,
    pub sync_page_delay: Duration,
    pub exchange_base_url: String,
    /// Number of most recent candles fed to the model
    pub window_size: u32,
    pub timesfm_url: String,
    pub timesfm_repo_id: String,
    pub timesfm_timeout: Duration,
    pub api_bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("dataset/crypto_data.db"),
            candle_table: "btc_data".to_string(),
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::D1,
            // 2011-09-13T00:00:00Z
            sync_start_ms: 1_315_872_000_000,
            sync_page_size: 1000,
            sync_page_delay: Duration::from_secs(1),
            exchange_base_url: "https://api.binance.com".to_string(),
            window_size: 1000,
            timesfm_url: "http://localhost:8501".to_string(),
            timesfm_repo_id: "google/timesfm-2.0-500m-pytorch".to_string(),
            timesfm_timeout: Duration::from_secs(120),
            api_bind: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();
        let defaults = Config::default();

        let candle_table = env_or("CANDLE_TABLE", &defaults.candle_table);
        validate_table_name(&candle_table)?;

        let timeframe = match std::env::var("TIMEFRAME") {
            Ok(raw) => raw.parse::<Timeframe>().map_err(|e| anyhow!(e))?,
            Err(_) => defaults.timeframe,
        };

        let sync_start_ms = match std::env::var("SYNC_START_DATE") {
            Ok(raw) => parse_start_date(&raw)?,
            Err(_) => defaults.sync_start_ms,
        };

        Ok(Config {
            database_path: PathBuf::from(env_or(
                "DATABASE_PATH",
                &defaults.database_path.to_string_lossy(),
            )),
            candle_table,
            symbol: env_or("SYMBOL", &defaults.symbol),
            timeframe,
            sync_start_ms,
            sync_page_size: env_parse("SYNC_PAGE_SIZE", defaults.sync_page_size)?,
            sync_page_delay: Duration::from_millis(env_parse(
                "SYNC_PAGE_DELAY_MS",
                defaults.sync_page_delay.as_millis() as u64,
            )?),
            exchange_base_url: env_or("EXCHANGE_BASE_URL", &defaults.exchange_base_url),
            window_size: env_parse("WINDOW_SIZE", defaults.window_size)?,
            timesfm_url: env_or("TIMESFM_URL", &defaults.timesfm_url),
            timesfm_repo_id: env_or("TIMESFM_REPO_ID", &defaults.timesfm_repo_id),
            timesfm_timeout: Duration::from_secs(env_parse(
                "TIMESFM_TIMEOUT_SECS",
                defaults.timesfm_timeout.as_secs(),
            )?),
            api_bind: env_or("API_BIND", &defaults.api_bind),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {}: {} ({})", name, raw, e)),
        _ => Ok(default),
    }
}

/// Midnight UTC of a `YYYY-MM-DD` date, in milliseconds.
pub fn parse_start_date(raw: &str) -> Result<i64, anyhow::Error> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid SYNC_START_DATE: {}", raw))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid SYNC_START_DATE: {}", raw))?;
    Ok(midnight.and_utc().timestamp_millis())
}

pub fn validate_table_name(name: &str) -> Result<(), anyhow::Error> {
    if !is_valid_identifier(name) {
        bail!("invalid table name: {:?}", name);
    }
    Ok(())
}
