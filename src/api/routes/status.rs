//! Health and status routes
//!
//! - GET /health/live  - liveness probe (process is alive)
//! - GET /health/ready - readiness probe (store is reachable)
//! - GET /status       - service status with live glucose stats

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::{
    glucose_window_stats, recent_glucose, GlucoseWindowStats, RecentReading, StoreResult,
};

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Ready once the store accepts connections.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    let store = state.store.clone();
    let reachable = tokio::task::spawn_blocking(move || store.connect().is_ok())
        .await
        .unwrap_or(false);

    if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Service status snapshot
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    /// Stats over the trailing hour, absent when no readings landed
    pub last_hour: Option<GlucoseWindowStats>,
    pub last_24_hours: Option<GlucoseWindowStats>,
    pub recent_readings: usize,
    pub latest_reading: Option<RecentReading>,
}

/// GET /status
pub async fn service_status(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<StatusResponse>> {
    let store = state.store.clone();
    let now = Utc::now();

    type Snapshot = (
        Option<GlucoseWindowStats>,
        Option<GlucoseWindowStats>,
        Vec<RecentReading>,
    );
    let (last_hour, last_24_hours, recent) =
        tokio::task::spawn_blocking(move || -> StoreResult<Snapshot> {
            let conn = store.connect()?;
            Ok((
                glucose_window_stats(&conn, 1, now)?,
                glucose_window_stats(&conn, 24, now)?,
                recent_glucose(&conn, 30, now)?,
            ))
        })
        .await
        .map_err(|e| ApiError::Internal(format!("status worker failed: {e}")))??;

    Ok(Json(StatusResponse {
        status: "healthy",
        service: "glucolog",
        timestamp: now,
        uptime_secs: state.start_time.elapsed().as_secs(),
        last_hour,
        last_24_hours,
        recent_readings: recent.len(),
        latest_reading: recent.into_iter().next(),
    }))
}
