//! API error types
//!
//! Maps core errors to HTTP responses. Validation problems are the
//! caller's fault (400); store problems are ours (500). Every error
//! body carries a request ID for log correlation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed; no work was attempted
    #[error("validation error: {0}")]
    Validation(String),

    /// Store/connectivity failure; any transaction was rolled back
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error (e.g. a worker task died)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub request_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error"
        );

        let body = ErrorResponse {
            error: self.to_string(),
            code,
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
