//! API error type and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use trailmap::TrailError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body is not usable at all (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The ledger could not commit or read; the client should retry the whole
    /// batch (503).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The session worker is gone or a task failed (500).
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::StorageUnavailable(_) => "storage_unavailable",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<TrailError> for ApiError {
    fn from(err: TrailError) -> Self {
        match err {
            TrailError::Storage(_) => ApiError::StorageUnavailable(err.to_string()),
            TrailError::SessionClosed | TrailError::Task(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
