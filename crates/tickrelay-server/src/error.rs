//! Error types for the relay's HTTP surface.
//!
//! [`RelayError`] unifies the failure modes of the page handlers into a
//! single enum that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tickrelay_core::ConfigError;
use tickrelay_log::LogError;

/// Errors that can occur in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The log service failed.
    #[error("log error: {0}")]
    Log(#[from] LogError),

    /// A page template failed to load or render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The configuration handed to the server is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Log(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Template(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %self, status = status.as_u16(), "Request failed");

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
