use anyhow::Result;
use ingest::prelude::*;
use shared::{get_pool, CandleStore, Config, OpenMode};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting candle ingest...");

    let config = Config::from_env()?;
    let pool = get_pool(&config.database_path, OpenMode::ReadWriteCreate).await?;
    let store = CandleStore::new(pool, &config.candle_table)?;
    store.create_table().await?;
    info!("Store ready, table {}", store.table());

    let client = BinanceClient::new(&config.exchange_base_url)?;
    let sync = Synchronizer::new(client, SyncConfig::from(&config));
    let report = sync.run(&store, config.sync_start_ms).await?;

    if report.aborted {
        warn!("Sync stopped early after {} pages; run again to continue", report.pages);
    }
    info!(
        "Loaded {} candles ({} new) into {}, table now holds {}",
        report.fetched,
        report.inserted,
        config.database_path.display(),
        store.count().await?
    );

    Ok(())
}
