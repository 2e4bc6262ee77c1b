//! Central handling of backend 401 responses.
//!
//! Handlers propagate `ApiError::Unauthorized` as an `AppError`, whose
//! response carries the [`UpstreamUnauthorized`] marker. This middleware
//! turns any marked response into a sign-out plus a redirect to the login
//! page, so no handler deals with expired tokens itself.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::auth::LOGIN_PATH;
use crate::error::{UpstreamUnauthorized, clear_sentry_user};
use crate::providers::Auth;

/// Message shown on the login page after a forced sign-out.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Sign the visitor out when the backend rejected their token.
pub async fn upstream_auth_middleware(request: Request, next: Next) -> Response {
    let session = request.extensions().get::<Session>().cloned();
    let response = next.run(request).await;

    if response.extensions().get::<UpstreamUnauthorized>().is_none() {
        return response;
    }

    if let Some(session) = session {
        let result = match Auth::rehydrate(session).await {
            Ok(mut auth) => auth.logout().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to clear session after backend 401");
        }
    }
    clear_sentry_user();
    tracing::info!("Backend rejected token, signed visitor out");

    let location = format!(
        "{LOGIN_PATH}?error={}",
        urlencoding::encode(SESSION_EXPIRED_MESSAGE)
    );
    Redirect::to(&location).into_response()
}
