//! Error types for comparison operations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use models_compare_common::RequestError;
use serde_json::json;

/// Errors surfaced to the caller of a comparison operation.
///
/// Catalog fetch failures and per-model inference failures never show up
/// here: the first degrade to the fallback catalog, the second become that
/// model's error outcome.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("Model with ID '{0}' not found")]
    ModelNotFound(String),

    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::MissingCredential(_) => (StatusCode::SERVICE_UNAVAILABLE, "missing_credential"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::ModelNotFound(_) => (StatusCode::NOT_FOUND, "model_not_found"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
