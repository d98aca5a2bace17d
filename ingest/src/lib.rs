//! Candle ingestion
//!
//! Walks an exchange's kline endpoint page by page from a fixed historical
//! start up to the current time and stores every candle in the SQLite candle
//! table, keyed by timestamp.
//!
//! Re-running is safe: inserts are insert-or-ignore, so a run that was cut
//! short by an exchange error is completed by simply running again.
//!
//! # Example
//!
//! ```no_run
//! use ingest::prelude::*;
//! use shared::{get_pool, CandleStore, Config, OpenMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let pool = get_pool(&config.database_path, OpenMode::ReadWriteCreate).await?;
//!     let store = CandleStore::new(pool, &config.candle_table)?;
//!     store.create_table().await?;
//!
//!     let client = BinanceClient::new(&config.exchange_base_url)?;
//!     let sync = Synchronizer::new(client, SyncConfig::from(&config));
//!     let report = sync.run(&store, config.sync_start_ms).await?;
//!     println!("{} new candles", report.inserted);
//!     Ok(())
//! }
//! ```

pub mod exchange;
pub mod sync;

pub mod prelude {
    pub use crate::exchange::*;
    pub use crate::sync::*;
}
