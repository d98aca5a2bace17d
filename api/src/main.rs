use anyhow::Result;
use api::{router, AppContext, TimesFmCheckpoint, TimesFmClient, TimesFmHparams};
use shared::{get_pool, CandleStore, Config, OpenMode};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting forecast API server...");

    let config = Config::from_env()?;
    let pool = get_pool(&config.database_path, OpenMode::ReadWrite).await?;
    let store = CandleStore::new(pool, &config.candle_table)?;
    info!("Connected to database");

    let model = TimesFmClient::load(
        &config.timesfm_url,
        TimesFmHparams::default(),
        TimesFmCheckpoint {
            huggingface_repo_id: config.timesfm_repo_id.clone(),
        },
        config.timesfm_timeout,
    )
    .await?;

    let ctx = AppContext::new(&config, store, Arc::new(model));
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind(&config.api_bind).await?;
    info!("API server listening on http://{}", config.api_bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return std::future::pending().await;
    }
    info!("Shutdown signal received, stopping...");
}
