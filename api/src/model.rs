//! TimesFM forecasting model
//!
//! The model itself runs inside an inference server. At start-up the service
//! asks the server to load a checkpoint with fixed hyperparameters; each
//! forecast is then one JSON round trip.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Frequency code sent alongside daily series.
pub const DAILY_FREQUENCY: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("inference server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected model output: {0}")]
    BadOutput(String),
}

/// Point forecaster over univariate series.
#[async_trait]
pub trait Forecaster: Send + Sync {
    /// Number of future steps produced per series
    fn horizon_len(&self) -> usize;

    /// One point forecast of `horizon_len()` values per input series.
    async fn forecast(&self, inputs: &[Vec<f64>], freq: &[u32]) -> Result<Vec<Vec<f64>>, ModelError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesFmHparams {
    pub backend: String,
    pub per_core_batch_size: u32,
    pub horizon_len: usize,
    pub input_patch_len: u32,
    pub output_patch_len: u32,
    pub num_layers: u32,
    pub model_dims: u32,
}

impl Default for TimesFmHparams {
    fn default() -> Self {
        Self {
            backend: "pytorch".to_string(),
            per_core_batch_size: 32,
            horizon_len: 128,
            input_patch_len: 32,
            output_patch_len: 128,
            num_layers: 50,
            model_dims: 1280,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesFmCheckpoint {
    pub huggingface_repo_id: String,
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    hparams: &'a TimesFmHparams,
    checkpoint: &'a TimesFmCheckpoint,
}

#[derive(Debug, Serialize)]
struct ForecastRequest<'a> {
    inputs: &'a [Vec<f64>],
    freq: &'a [u32],
}

#[derive(Debug, Deserialize)]
struct ForecastReply {
    point_forecast: Vec<Vec<f64>>,
}

/// Handle to a TimesFM model loaded in an inference server
#[derive(Debug, Clone)]
pub struct TimesFmClient {
    base_url: String,
    hparams: TimesFmHparams,
    checkpoint: TimesFmCheckpoint,
    client: reqwest::Client,
}

impl TimesFmClient {
    /// Ask the server at `base_url` to load `checkpoint` with `hparams`.
    pub async fn load(
        base_url: &str,
        hparams: TimesFmHparams,
        checkpoint: TimesFmCheckpoint,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let model = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            hparams,
            checkpoint,
            client,
        };

        info!(
            "Loading TimesFM checkpoint {} via {}",
            model.checkpoint.huggingface_repo_id, model.base_url
        );
        let response = model
            .client
            .post(format!("{}/v1/models/load", model.base_url))
            .json(&LoadRequest {
                hparams: &model.hparams,
                checkpoint: &model.checkpoint,
            })
            .send()
            .await?;
        check_status(response).await?;

        info!("Model loaded, horizon {}", model.hparams.horizon_len);
        Ok(model)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Forecaster for TimesFmClient {
    fn horizon_len(&self) -> usize {
        self.hparams.horizon_len
    }

    async fn forecast(&self, inputs: &[Vec<f64>], freq: &[u32]) -> Result<Vec<Vec<f64>>, ModelError> {
        debug!("Forecasting {} series", inputs.len());
        let response = self
            .client
            .post(format!("{}/v1/forecast", self.base_url))
            .json(&ForecastRequest { inputs, freq })
            .send()
            .await?;
        let reply: ForecastReply = check_status(response).await?.json().await?;

        if reply.point_forecast.len() != inputs.len() {
            return Err(ModelError::BadOutput(format!(
                "expected {} series, got {}",
                inputs.len(),
                reply.point_forecast.len()
            )));
        }
        if let Some(series) = reply
            .point_forecast
            .iter()
            .find(|s| s.len() != self.hparams.horizon_len)
        {
            return Err(ModelError::BadOutput(format!(
                "expected horizon {}, got {}",
                self.hparams.horizon_len,
                series.len()
            )));
        }
        Ok(reply.point_forecast)
    }
}
