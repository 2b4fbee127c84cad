//! Error types for studio-gen
//!
//! `GenerationError` is the failure taxonomy of the generation operations.
//! `ApiError` renders failures as JSON HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Generation failure taxonomy
///
/// Batch-fatal classes (`Configuration`, `NotFound`, `Unauthorized`) abort an
/// operation before any item is processed. The remaining classes are item
/// scoped inside a batch and only surface directly from single-shot calls
/// such as summary generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Missing or invalid provider credentials; never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input the provider cannot use
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network failure, timeout or unreadable provider response
    #[error("Transient provider error: {0}")]
    TransientProvider(String),

    /// Provider explicitly failed or rejected the job
    #[error("Provider reported failure: {0}")]
    ProviderFailure(String),

    /// Provider reported success but the payload is unusable
    #[error("Malformed provider success: {0}")]
    MalformedSuccess(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Requester does not own the resource
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("No messages found for session {0}")]
    EmptyTranscript(uuid::Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] studio_common::Error),
}

impl GenerationError {
    /// Errors that stop a whole batch rather than a single item
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            GenerationError::Configuration(_)
                | GenerationError::NotFound(_)
                | GenerationError::Unauthorized(_)
        )
    }
}

impl From<sqlx::Error> for GenerationError {
    fn from(err: sqlx::Error) -> Self {
        GenerationError::Storage(studio_common::Error::Database(err))
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

    /// Requester may not access the resource (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing identity (401)
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Feature not configured on this server (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Upstream provider failed (502)
    #[error("Upstream provider error: {0}")]
    BadGateway(String),

    /// studio-common error
    #[error("Common error: {0}")]
    Common(#[from] studio_common::Error),
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::NotFound(msg) => ApiError::NotFound(msg),
            GenerationError::Unauthorized(msg) => ApiError::Forbidden(msg),
            GenerationError::Validation(msg) => ApiError::BadRequest(msg),
            GenerationError::EmptyTranscript(_) => ApiError::BadRequest(err.to_string()),
            GenerationError::Configuration(msg) => ApiError::Unavailable(msg),
            GenerationError::TransientProvider(_)
            | GenerationError::ProviderFailure(_)
            | GenerationError::MalformedSuccess(_) => ApiError::BadGateway(err.to_string()),
            GenerationError::Storage(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg)
            }
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", msg),
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
