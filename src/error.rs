//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type of the crate. Errors on the
//! WebSocket paths are logged and never shown to clients; the HTTP surface
//! renders them as structured JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 3003,
///     "message": "relay hub is not running"
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
}

/// Crate-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category      | HTTP Status                 |
/// |-----------|---------------|-----------------------------|
/// | 1000–1999 | Configuration | 500 Internal Server Error   |
/// | 3000–3999 | Relay runtime | 502 Bad Gateway / 503       |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A configuration value is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Transport-level failure talking to the market-data provider.
    #[error("upstream websocket error: {0}")]
    Upstream(#[from] tokio_tungstenite::tungstenite::Error),

    /// The provider sent a frame the relay could not decode.
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// The relay hub task has stopped and can no longer take commands.
    #[error("relay hub is not running")]
    RelayUnavailable,
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Config(_) => 1001,
            Self::Upstream(_) => 3001,
            Self::UpstreamProtocol(_) => 3002,
            Self::RelayUnavailable => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) | Self::UpstreamProtocol(_) => StatusCode::BAD_GATEWAY,
            Self::RelayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
