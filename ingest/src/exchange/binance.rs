//! Binance spot klines over REST

use async_trait::async_trait;
use serde::de::{self, Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use shared::{Candle, Timeframe};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::{ExchangeError, OhlcvSource};

const KLINES_PATH: &str = "/api/v3/klines";

/// Binance REST client
#[derive(Debug, Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct KlinesQuery<'a> {
    symbol: &'a str,
    interval: &'a str,
    #[serde(rename = "startTime")]
    start_time: i64,
    limit: u32,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ExchangeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// `BTC/USDT` -> `BTCUSDT`
pub fn market_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[async_trait]
impl OhlcvSource for BinanceClient {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let market = market_symbol(symbol);
        let query = KlinesQuery {
            symbol: &market,
            interval: timeframe.as_str(),
            start_time: since,
            limit,
        };
        debug!("GET {}{} {:?}", self.base_url, KLINES_PATH, query);

        let response = self
            .client
            .get(format!("{}{}", self.base_url, KLINES_PATH))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Vec<BinanceKlineRaw> = response.json().await?;
        raw.into_iter().map(Candle::try_from).collect()
    }
}

/// Binance returns klines as positional arrays:
/// `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`
#[derive(Debug, Clone)]
pub struct BinanceKlineRaw {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

impl<'de> Deserialize<'de> for BinanceKlineRaw {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KlineVisitor;

        impl<'de> Visitor<'de> for KlineVisitor {
            type Value = BinanceKlineRaw;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a Binance kline array with at least 6 elements")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let open_time = next(&mut seq, 0, "open_time")?;
                let open = next(&mut seq, 1, "open")?;
                let high = next(&mut seq, 2, "high")?;
                let low = next(&mut seq, 3, "low")?;
                let close = next(&mut seq, 4, "close")?;
                let volume = next(&mut seq, 5, "volume")?;

                // close_time, quote volume, trade count, taker volumes
                while seq.next_element::<IgnoredAny>()?.is_some() {}

                Ok(BinanceKlineRaw {
                    open_time,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            }
        }

        deserializer.deserialize_seq(KlineVisitor)
    }
}

fn next<'de, A, T>(seq: &mut A, index: usize, field: &'static str) -> Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::invalid_length(index, &field))
}

impl TryFrom<BinanceKlineRaw> for Candle {
    type Error = ExchangeError;

    fn try_from(raw: BinanceKlineRaw) -> Result<Self, Self::Error> {
        let parse = |name: &str, value: &str| {
            value
                .parse::<f64>()
                .map_err(|e| ExchangeError::Malformed(format!("{} '{}': {}", name, value, e)))
        };

        Ok(Candle::new(
            raw.open_time,
            parse("open", &raw.open)?,
            parse("high", &raw.high)?,
            parse("low", &raw.low)?,
            parse("close", &raw.close)?,
            parse("volume", &raw.volume)?,
        ))
    }
}
