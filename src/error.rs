//! Service error types with HTTP status code mapping.
//!
//! [`NebulaError`] is the central error type for the registry, the event
//! bus and the REST layer. Each variant maps to a specific HTTP status
//! code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "server entry already exists: lobby",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                    |
/// |-----------|--------------------|--------------------------------|
/// | 1000–1999 | Validation         | 400 Bad Request                |
/// | 2000–2999 | Not Found/Conflict | 404 Not Found / 409 Conflict   |
/// | 3000–3999 | Server             | 500 / 501 / 502                |
#[derive(Debug, thiserror::Error)]
pub enum NebulaError {
    /// No server entry with the given name.
    #[error("server entry not found: {0}")]
    ServerNotFound(String),

    /// No player row with the given uuid.
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    /// A server entry with the given name is already registered.
    #[error("server entry already exists: {0}")]
    AlreadyExists(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested feature is not configured on this instance.
    #[error("feature disabled: {0}")]
    FeatureDisabled(String),

    /// Storage backend failure, message passed through verbatim.
    #[error("storage error: {0}")]
    Storage(String),

    /// Publishing an envelope on a channel failed.
    #[error("publish error: {0}")]
    Publish(String),

    /// An external collaborator (IP reputation service) failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NebulaError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ServerNotFound(_) => 2001,
            Self::AlreadyExists(_) => 2002,
            Self::PlayerNotFound(_) => 2003,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
            Self::Publish(_) => 3002,
            Self::FeatureDisabled(_) => 3003,
            Self::Upstream(_) => 3004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServerNotFound(_) | Self::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::FeatureDisabled(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Publish(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for NebulaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
