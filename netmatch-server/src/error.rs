//! Error types for netmatch-server HTTP handlers
//!
//! Every failure body carries a stable machine-readable `code`, a
//! human-readable `message`, and optional `details`:
//!
//! ```json
//! {"success": false, "error": {"code": "COMPUTATION_FAILED", "message": "...", "details": "..."}}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{InvokeError, OrchestratorError, StoreError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Incomplete request (400)
    #[error("Missing required fields: {0}")]
    MissingField(String),

    /// Request body is not a JSON object of the expected shape (400)
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local storage problem (500, or 404 for lookups)
    #[error("{context}")]
    Storage {
        context: &'static str,
        source: StoreError,
    },

    /// Scoring unit problem (500)
    #[error("{context}")]
    Computation {
        context: &'static str,
        source: InvokeError,
    },
}

impl ApiError {
    /// Attach a route-level summary to an orchestrator error
    pub fn from_orchestrator(context: &'static str, err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::MissingField(field) => ApiError::MissingField(field),
            OrchestratorError::Store(StoreError::NotFound(what)) => ApiError::NotFound(what),
            OrchestratorError::Store(source) => ApiError::Storage { context, source },
            OrchestratorError::Computation(source) => ApiError::Computation { context, source },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            ApiError::MissingField(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELD", None),
            ApiError::InvalidBody(reason) => {
                (StatusCode::BAD_REQUEST, "INVALID_BODY", Some(reason.clone()))
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            ApiError::Storage { source, .. } => {
                let code = match source {
                    StoreError::StorageWriteFailed(_) => "STORAGE_WRITE_FAILED",
                    StoreError::StorageReadFailed(_) => "STORAGE_READ_FAILED",
                    StoreError::CorruptStore(_) => "CORRUPT_STORE",
                    StoreError::NotFound(_) => "NOT_FOUND",
                };
                let status = if matches!(source, StoreError::NotFound(_)) {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, code, Some(source.to_string()))
            }
            ApiError::Computation { source, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                source.kind(),
                Some(source.to_string()),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code, error = %self, details = ?details, "Request failed");
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": self.to_string(),
                "details": details,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
