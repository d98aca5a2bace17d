//! Forecast pipeline: recent window -> gap repair -> inference -> response

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use shared::{check_readable, CandleRow};
use tracing::{debug, info};

use crate::error::ForecastError;
use crate::model::DAILY_FREQUENCY;
use crate::state::AppContext;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub point_forecast: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub symbol: String,
    pub timeframe: String,
    pub last_historical_timestamp: NaiveDateTime,
    pub last_historical_price: f64,
    pub forecast: Vec<ForecastPoint>,
}

/// Ordered recent history with every close present.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastWindow {
    pub timestamps: Vec<NaiveDateTime>,
    pub closes: Vec<f64>,
}

/// Load the most recent candles, oldest first.
pub async fn load_window(ctx: &AppContext) -> Result<Vec<CandleRow>, ForecastError> {
    check_readable(&ctx.database_path)
        .map_err(|_| ForecastError::Access(ctx.database_path.display().to_string()))?;

    let table = ctx.store.table();
    if !ctx.store.table_exists().await? {
        return Err(ForecastError::NotFound(format!("table {} not found", table)));
    }

    let rows = ctx.store.load_recent(ctx.window_size).await?;
    if rows.is_empty() {
        return Err(ForecastError::NotFound(format!("no data in table {}", table)));
    }
    Ok(rows)
}

/// Fill interior gaps by linear interpolation between the nearest known
/// neighbours. Leading and trailing gaps are left as they are.
pub fn interpolate_linear(values: &mut [Option<f64>]) {
    let mut prev: Option<(usize, f64)> = None;
    for i in 0..values.len() {
        let Some(v) = values[i] else { continue };
        if let Some((j, pv)) = prev {
            let span = (i - j) as f64;
            for (k, slot) in values.iter_mut().enumerate().take(i).skip(j + 1) {
                *slot = Some(pv + (v - pv) * (k - j) as f64 / span);
            }
        }
        prev = Some((i, v));
    }
}

/// Convert rows to calendar time and repair missing closes.
pub fn build_window(rows: &[CandleRow]) -> Result<ForecastWindow, ForecastError> {
    let timestamps = rows
        .iter()
        .map(|r| {
            r.datetime()
                .ok_or_else(|| ForecastError::Internal(format!("timestamp out of range: {}", r.timestamp)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut closes: Vec<Option<f64>> = rows.iter().map(|r| r.close).collect();
    let missing = closes.iter().filter(|c| c.is_none()).count();
    if missing > 0 {
        debug!("Interpolating {} missing closes", missing);
        interpolate_linear(&mut closes);
    }

    let closes = closes
        .into_iter()
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| {
            ForecastError::Validation("missing close values remain after interpolation".to_string())
        })?;

    Ok(ForecastWindow { timestamps, closes })
}

/// `n` consecutive steps starting one step after `last`.
pub fn forecast_timestamps(
    last: NaiveDateTime,
    step: TimeDelta,
    n: usize,
) -> Result<Vec<NaiveDateTime>, ForecastError> {
    let out_of_range = || ForecastError::Internal("forecast timestamp out of range".to_string());
    (1..=n)
        .map(|i| {
            let i = i32::try_from(i).map_err(|_| out_of_range())?;
            step.checked_mul(i)
                .and_then(|offset| last.checked_add_signed(offset))
                .ok_or_else(out_of_range)
        })
        .collect()
}

pub async fn predict(ctx: &AppContext) -> Result<ForecastResponse, ForecastError> {
    let rows = load_window(ctx).await?;
    let window = build_window(&rows)?;

    let (Some(&last_ts), Some(&last_close)) = (window.timestamps.last(), window.closes.last()) else {
        return Err(ForecastError::Internal("empty forecast window".to_string()));
    };
    info!("Loaded {} candles, last {}", window.closes.len(), last_ts);

    let inputs = [window.closes];
    let output = ctx.model.forecast(&inputs, &[DAILY_FREQUENCY]).await?;
    let series = output
        .into_iter()
        .next()
        .ok_or_else(|| ForecastError::Internal("model returned no series".to_string()))?;

    let forecast = forecast_timestamps(last_ts, ctx.timeframe.step(), series.len())?
        .into_iter()
        .zip(series)
        .map(|(timestamp, point_forecast)| ForecastPoint {
            timestamp,
            point_forecast,
        })
        .collect();

    Ok(ForecastResponse {
        symbol: ctx.symbol.clone(),
        timeframe: ctx.timeframe.to_string(),
        last_historical_timestamp: last_ts,
        last_historical_price: last_close,
        forecast,
    })
}
