use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the ingestion and scraping pipelines.
///
/// Per-item failures (one corrupt PDF, one bad URL) are logged and skipped
/// at the call site; everything surfaced through this type is meant to
/// propagate and terminate the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    /// Extraction failure for a single source file. Recoverable: the loader
    /// logs it and continues with the remaining files.
    #[error("failed to extract {path}: {message}")]
    Extract { path: PathBuf, message: String },

    /// The embedding/chat API rejected our credentials. There is no
    /// fallback model, so this is always fatal.
    #[error("api credentials rejected (status {status})")]
    Auth { status: u16 },

    #[error("api error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("vector store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned from the chat HTTP surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
