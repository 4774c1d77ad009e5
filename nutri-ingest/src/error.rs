//! Error types for nutri-ingest
//!
//! `IngestError` covers the ingestion run; `ApiError` is what HTTP handlers
//! return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Ingestion failure above the level of a single row
#[derive(Debug, Error)]
pub enum IngestError {
    /// The dataset could not be opened
    #[error("Dataset source unavailable ({origin}): {reason}")]
    SourceUnavailable {
        origin: String,
        #[source]
        reason: std::io::Error,
    },

    /// A required column is absent from the header line
    #[error("Missing required header column: {0}")]
    MissingRequiredHeader(&'static str),

    /// Reading the dataset failed part-way through
    #[error("Dataset read failed: {0}")]
    SourceRead(String),

    /// The blocking parse worker panicked or was cancelled
    #[error("Parse worker failed: {0}")]
    Worker(String),

    /// The phase's bulk write could not be committed
    #[error("Phase transaction failed: {0}")]
    PhaseTransaction(#[from] nutri_common::Error),
}

impl IngestError {
    /// Fatal errors abort the whole run before any row is parsed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::SourceUnavailable { .. } | IngestError::MissingRequiredHeader(_)
        )
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// nutri-common error
    #[error("Common error: {0}")]
    Common(#[from] nutri_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
