use shared::{CandleStore, Timeframe};
use std::path::PathBuf;
use std::sync::Arc;

use crate::model::Forecaster;

/// Everything loaded once at start-up and shared read-only by all requests.
#[derive(Clone)]
pub struct AppContext {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub database_path: PathBuf,
    pub store: CandleStore,
    /// Most recent candles fed to the model per request
    pub window_size: u32,
    pub model: Arc<dyn Forecaster>,
}

impl AppContext {
    pub fn new(
        config: &shared::Config,
        store: CandleStore,
        model: Arc<dyn Forecaster>,
    ) -> Arc<Self> {
        Arc::new(Self {
            symbol: config.symbol.clone(),
            timeframe: config.timeframe,
            database_path: config.database_path.clone(),
            store,
            window_size: config.window_size,
            model,
        })
    }
}
