//! Proxy errors. Every failure is answered with a 500 and a JSON body of
//! the form `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while forwarding a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No backend configured.
    #[error("API_PROXY_TARGET is not configured")]
    NotConfigured,

    /// Request body could not be read.
    #[error("Failed to read request body: {0}")]
    Body(#[from] axum::Error),

    /// Upstream request failed.
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Upstream(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Upstream request failed");
        } else {
            tracing::warn!(error = %self, "Proxy request rejected");
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Result type alias for `ProxyError`.
pub type Result<T> = std::result::Result<T, ProxyError>;
