use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shared::StoreError;
use thiserror::Error;
use tracing::{error, warn};

use crate::model::ModelError;

/// Every way a forecast request can fail. Each kind maps to exactly one status.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no read access to database file {0}")]
    Access(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Validation(String),
    #[error("forecast failed: {0}")]
    Inference(#[from] ModelError),
    #[error("{0}")]
    Internal(String),
}

impl ForecastError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Access(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Validation(_) | Self::Inference(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!("Forecast request failed: {}", detail);
        } else {
            warn!("Forecast request rejected: {}", detail);
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
