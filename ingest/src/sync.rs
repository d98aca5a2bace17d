//! Paginated historical candle synchronization

use chrono::Utc;
use shared::{Candle, CandleStore, Config, StoreError, Timeframe};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::exchange::{ExchangeError, OhlcvSource};

/// Pagination settings for one sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Candles requested per page
    pub page_size: u32,
    /// Pause between pages
    pub page_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SyncConfig {
    fn from(config: &Config) -> Self {
        Self {
            symbol: config.symbol.clone(),
            timeframe: config.timeframe,
            page_size: config.sync_page_size,
            page_delay: config.sync_page_delay,
        }
    }
}

/// Candles gathered by one pagination pass
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub candles: Vec<Candle>,
    /// Start timestamp of every page request, in order
    pub cursors: Vec<i64>,
    /// Set when the pass was cut short by a fetch error
    pub error: Option<ExchangeError>,
}

/// Summary of a completed sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: usize,
    pub fetched: usize,
    pub inserted: u64,
    pub aborted: bool,
}

pub struct Synchronizer<S> {
    source: S,
    config: SyncConfig,
}

impl<S: OhlcvSource> Synchronizer<S> {
    pub fn new(source: S, config: SyncConfig) -> Self {
        Self { source, config }
    }

    /// Walk the exchange from `since` up to the current time.
    ///
    /// Stops on an empty page, on a fetch error (keeping what was already
    /// gathered) or once the cursor passes the wall clock.
    pub async fn fetch_all(&self, since: i64) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let mut cursor = since;

        while cursor < Utc::now().timestamp_millis() {
            outcome.cursors.push(cursor);
            let page = match self
                .source
                .fetch_ohlcv(&self.config.symbol, self.config.timeframe, cursor, self.config.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!("Failed to fetch candles at {}: {}", cursor, e);
                    outcome.error = Some(e);
                    break;
                }
            };

            let Some(last) = page.last().map(|c| c.timestamp) else {
                debug!("Empty page at {}, no more data", cursor);
                break;
            };

            debug!("Fetched {} candles starting at {}", page.len(), cursor);
            outcome.candles.extend(page);

            let next = last.saturating_add(1);
            if next <= cursor {
                warn!("Exchange returned candles before cursor {} (last {}), stopping", cursor, last);
                break;
            }
            cursor = next;

            tokio::time::sleep(self.config.page_delay).await;
        }

        outcome
    }

    /// Fetch everything from `since` and insert-or-ignore it into `store`.
    pub async fn run(&self, store: &CandleStore, since: i64) -> Result<SyncReport, StoreError> {
        info!(
            "Syncing {} {} from {}",
            self.config.symbol, self.config.timeframe, since
        );
        let outcome = self.fetch_all(since).await;
        let inserted = store.upsert_candles(&outcome.candles).await?;

        Ok(SyncReport {
            pages: outcome.cursors.len(),
            fetched: outcome.candles.len(),
            inserted,
            aborted: outcome.error.is_some(),
        })
    }
}
