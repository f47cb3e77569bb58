//! Ingestion route
//!
//! - POST /health-data - receive one export batch
//!
//! The batch body is any of the accepted envelope shapes; the session
//! identifier and automation-type tag travel out-of-band in request
//! headers, the way the export automation sends them.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::api::dto::{IngestErrorResponse, IngestResponse};
use crate::api::state::AppState;
use crate::ingest::{ingest_batch, BatchMeta};

/// POST /health-data
///
/// Processes the batch as one atomic unit: either the whole batch's
/// successful subset commits, or a store failure rolls everything back
/// and reports `{status: "error"}`.
pub async fn receive_health_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let meta = BatchMeta::new(
        header_or_unknown(&headers, "session-id"),
        header_or_unknown(&headers, "automation-type"),
    );

    let store = state.store.clone();
    let result =
        tokio::task::spawn_blocking(move || ingest_batch(&store, body, &meta)).await;

    match result {
        Ok(Ok(summary)) => (
            StatusCode::OK,
            Json(IngestResponse {
                status: "success",
                summary,
            }),
        )
            .into_response(),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "ingestion batch failed, rolled back");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IngestErrorResponse {
                    status: "error",
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
        Err(join_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(IngestErrorResponse {
                status: "error",
                message: format!("ingestion worker failed: {join_err}"),
            }),
        )
            .into_response(),
    }
}

/// Header value, tolerating absence the way the exporter's optional
/// metadata requires (HeaderMap lookups are already case-insensitive)
fn header_or_unknown(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
