//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Route handlers return `Result<T, AppError>` for
//! failures they cannot show inline.
//!
//! A backend 401 is special: the response is marked with
//! [`UpstreamUnauthorized`] so that `middleware::upstream_auth` can sign the
//! visitor out and send them to the login page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::ApiError;
use crate::providers::{AuthError, CartError, ReviewError, StoreError};

/// Response extension marking a backend 401.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamUnauthorized;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Visitor store (session) failed.
    #[error("Session error: {0}")]
    Store(#[from] StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The visitor lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Api(e) => Self::Api(e),
            CartError::Store(e) => Self::Store(e),
            CartError::InvalidQuantity => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected { source, .. } => Self::Api(source),
            AuthError::Store(e) => Self::Store(e),
        }
    }
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Store(e) => Self::Store(e),
            ReviewError::EmptyText => Self::BadRequest(err.to_string()),
        }
    }
}

impl AppError {
    /// Whether this error is a backend 401.
    #[must_use]
    pub const fn is_upstream_unauthorized(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Api(ApiError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Api(ApiError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Api(ApiError::Http(e)) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Api(err) => err.user_message(),
            _ => self.to_string(),
        };

        let mut response = (status, message).into_response();
        if self.is_upstream_unauthorized() {
            response.extensions_mut().insert(UpstreamUnauthorized);
        }
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Turn a backend failure into a message to show inline on the page.
///
/// 401s are not shown inline; they propagate so the visitor is signed out.
///
/// # Errors
///
/// Returns the error unchanged when it is a 401.
pub fn inline_message(err: ApiError) -> Result<String> {
    if err.is_unauthorized() {
        return Err(AppError::Api(err));
    }
    tracing::warn!(error = %err, "Backend call failed");
    Ok(err.user_message())
}

/// [`inline_message`] for cart failures.
///
/// # Errors
///
/// Returns the error when it wraps a 401.
pub fn inline_cart_message(err: CartError) -> Result<String> {
    match err {
        CartError::Api(e) => inline_message(e),
        other => Ok(other.user_message()),
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "64f1c0")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
