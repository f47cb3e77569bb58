//! Glucolog HTTP API
//!
//! JSON surface over the ingestion-and-analytics core, built with Axum.
//!
//! # Endpoints
//!
//! ## Ingest
//! - `POST /health-data` - receive one export batch
//!
//! ## Query
//! - `GET /api/v1/data/glucose` - windowed glucose readings
//! - `GET /api/v1/data/sleep` - windowed sleep sessions
//! - `GET /api/v1/data/exercise` - windowed exercise sessions
//!
//! ## Analysis
//! - `GET /api/v1/analysis/patterns` - temporal pattern summaries
//! - `GET /api/v1/analysis/anomalies` - z-score outlier detection
//! - `GET /api/v1/analysis/hypoglycemia` - last hypo event + recovery
//! - `GET /api/v1/analysis/correlations` - daily cross-metric correlation
//!
//! ## Health
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness probe
//! - `GET /status` - service status with live glucose stats

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/data/glucose", get(routes::data::get_glucose_data))
        .route("/data/sleep", get(routes::data::get_sleep_data))
        .route("/data/exercise", get(routes::data::get_exercise_data))
        .route("/analysis/patterns", get(routes::analysis::detect_patterns))
        .route("/analysis/anomalies", get(routes::analysis::detect_anomalies))
        .route(
            "/analysis/hypoglycemia",
            get(routes::analysis::find_hypoglycemia),
        )
        .route(
            "/analysis/correlations",
            get(routes::analysis::find_correlations),
        );

    let health_routes = Router::new()
        .route("/live", get(routes::status::liveness))
        .route("/ready", get(routes::status::readiness));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/health-data", post(routes::ingest::receive_health_data))
        .route("/status", get(routes::status::service_status))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("glucolog API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("server error: {e}")))?;

    tracing::info!("glucolog API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
