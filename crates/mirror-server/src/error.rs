//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// API errors.
///
/// Raw upstream errors never reach the wire; the pipeline and composer
/// absorb them into safe verdicts and fallback replies. What is left here
/// are caller mistakes and service readiness.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body was not valid JSON for the chat schema.
    #[error("Payload tidak valid")]
    InvalidPayload,

    /// Completion credentials are not configured.
    #[error("Layanan belum siap: kunci API belum dikonfigurasi")]
    NotConfigured,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::InvalidPayload => (StatusCode::BAD_REQUEST, None),
            ApiError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, None),
            ApiError::Internal(detail) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Some(detail.clone()))
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            detail,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
