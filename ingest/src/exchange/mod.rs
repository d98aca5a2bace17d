//! Exchange integration module
//!
//! The ingest loop only needs one capability from an exchange: a page of
//! candles at or after a timestamp. [`OhlcvSource`] is that seam.

pub mod binance;

pub use binance::*;

use async_trait::async_trait;
use shared::{Candle, Timeframe};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("exchange returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed kline: {0}")]
    Malformed(String),
}

/// Paginated OHLCV query.
#[async_trait]
pub trait OhlcvSource: Send + Sync {
    /// Up to `limit` candles with `timestamp >= since`, oldest first.
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError>;
}
