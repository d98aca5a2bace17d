use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ForecastError;
use crate::forecast::{self, ForecastResponse};
use crate::state::AppContext;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/predict", get(predict))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": env!("GIT_HASH"),
        "git_branch": env!("GIT_BRANCH"),
        "build_time": env!("BUILD_TIME"),
        "build_profile": env!("BUILD_PROFILE"),
    }))
}

async fn predict(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<ForecastResponse>, ForecastError> {
    info!("Forecast request for {} {}", ctx.symbol, ctx.timeframe);
    let response = forecast::predict(&ctx).await?;
    info!("Forecast done, {} points", response.forecast.len());
    Ok(Json(response))
}
