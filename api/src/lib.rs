//! Forecast service
//!
//! Serves `GET /predict`: the most recent candles from the SQLite store,
//! gap-repaired and run through a TimesFM model, returned as JSON.

pub mod error;
pub mod forecast;
pub mod model;
pub mod routes;
pub mod state;

pub use error::ForecastError;
pub use model::{Forecaster, ModelError, TimesFmCheckpoint, TimesFmClient, TimesFmHparams};
pub use routes::router;
pub use state::AppContext;
