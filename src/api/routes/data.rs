//! Read/query routes
//!
//! - GET /api/v1/data/glucose
//! - GET /api/v1/data/sleep
//! - GET /api/v1/data/exercise
//!
//! All three accept the same optional `start_date`/`end_date`
//! (both-or-neither, end inclusive) and `limit` parameters and echo
//! them back alongside the rows.

use axum::{
    extract::{Query, State},
    Json,
};
use rusqlite::Connection;
use std::sync::Arc;

use crate::api::dto::{range_label, RangeQuery, TableResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::{
    exercise_in_window, glucose_in_window, sleep_in_window, DateWindow, Limit, StoreResult,
};

/// GET /api/v1/data/glucose
pub async fn get_glucose_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> ApiResult<Json<TableResponse<crate::store::StoredGlucose>>> {
    windowed_table(&state, &params, "glucose", glucose_in_window).await
}

/// GET /api/v1/data/sleep
pub async fn get_sleep_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> ApiResult<Json<TableResponse<crate::store::StoredSleep>>> {
    windowed_table(&state, &params, "sleep", sleep_in_window).await
}

/// GET /api/v1/data/exercise
pub async fn get_exercise_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> ApiResult<Json<TableResponse<crate::store::StoredExercise>>> {
    windowed_table(&state, &params, "exercise", exercise_in_window).await
}

/// Validate parameters, run the query on a blocking worker, echo back
async fn windowed_table<T: Send + 'static>(
    state: &AppState,
    params: &RangeQuery,
    table_name: &'static str,
    query: fn(&Connection, Option<&DateWindow>, Limit) -> StoreResult<Vec<T>>,
) -> ApiResult<Json<TableResponse<T>>> {
    let window = params.window()?;
    let limit = params.parse_limit()?;

    let store = state.store.clone();
    let data = tokio::task::spawn_blocking(move || -> StoreResult<Vec<T>> {
        let conn = store.connect()?;
        query(&conn, window.as_ref(), limit)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("query worker failed: {e}")))??;

    Ok(Json(TableResponse {
        table_name,
        total_records: data.len(),
        date_range: range_label(window.as_ref()),
        limit,
        data,
    }))
}
