//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every endpoint returns the
//! same error shape.
//!
//! # Key invariants and assumptions
//! - Error responses carry a stable `code` and a human-readable `message`.
//! - Status codes align with the error category.
//!
//! # Security considerations
//! - Upstream failures are logged server-side with subject, endpoint and
//!   status. Clients only see a generic message; upstream bodies never leave
//!   the process.
use crate::api::types::ErrorResponse;
use crate::person::AggregateError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use gateway::api::error::ApiError;
/// use gateway::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::NOT_FOUND,
///     body: ErrorResponse {
///         code: "not_found".to_string(),
///         message: "subject not found".to_string(),
///         request_id: None,
///     },
/// };
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 500 Internal Server Error from an aggregation failure.
///
/// # What it does
/// Logs the failure with its subject, endpoint and status, then returns a
/// generic internal error response.
pub fn api_internal(message: &str, err: &AggregateError) -> ApiError {
    let upstream = err.upstream();
    tracing::error!(
        subject = err.subject_id(),
        endpoint = upstream.map(|source| source.endpoint()),
        status = upstream.and_then(|source| source.status()),
        error = %err,
        "attribute lookup failed"
    );
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::NotFound { .. } => api_not_found("subject not found"),
            other => api_internal("attribute lookup failed", &other),
        }
    }
}
