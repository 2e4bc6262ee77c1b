//! Authentication extractors.
//!
//! Every extractor rehydrates [`Auth`] from the request's session, so a
//! handler never sees a half-loaded sign-in state.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::UserId;
use tower_sessions::Session;

use crate::api::Credentials;
use crate::api::types::User;
use crate::providers::{Auth, StoreError};

/// Login page path.
pub const LOGIN_PATH: &str = "/auth/login";

/// The current visitor: their session and rehydrated auth state.
///
/// Never rejects a guest.
///
/// ```rust,ignore
/// async fn handler(visitor: Visitor) -> impl IntoResponse {
///     match visitor.user() {
///         Some(user) => format!("Hello, {}!", user.display_name()),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct Visitor {
    pub session: Session,
    pub auth: Auth<Session>,
}

impl Visitor {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.auth.user()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.auth.user().map(|user| &user.id)
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.auth.credentials()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.auth.role().is_some_and(|role| role.is_admin())
    }
}

/// A signed-in visitor.
pub struct SignedIn {
    pub visitor: Visitor,
    pub credentials: Credentials,
    pub user: User,
}

impl SignedIn {
    fn from_visitor(visitor: Visitor) -> Option<Self> {
        let credentials = visitor.credentials()?.clone();
        let user = visitor.user()?.clone();
        Some(Self {
            visitor,
            credentials,
            user,
        })
    }
}

/// Extractor that requires a signed-in visitor.
///
/// Guests are redirected to the login page.
pub struct RequireAuth(pub SignedIn);

/// Extractor that requires a signed-in `admin` or `admin-seller`.
///
/// Guests are redirected to the login page, other roles to the home page.
pub struct RequireAdmin(pub SignedIn);

/// Error returned when an extractor cannot admit the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// Signed in without the needed role.
    RedirectHome,
    /// No session on the request or the session store failed.
    SessionUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::SessionUnavailable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl From<StoreError> for AuthRejection {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Failed to rehydrate auth state");
        Self::SessionUnavailable
    }
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::SessionUnavailable)?;

        let auth = Auth::rehydrate(session.clone()).await?;
        Ok(Self { session, auth })
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let visitor = Visitor::from_request_parts(parts, state).await?;
        SignedIn::from_visitor(visitor)
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(signed_in) = RequireAuth::from_request_parts(parts, state).await?;
        if !signed_in.user.role.is_admin() {
            return Err(AuthRejection::RedirectHome);
        }
        Ok(Self(signed_in))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::Request;
    use serde_json::json;
    use tower_sessions::MemoryStore;

    use crate::providers::keys;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    async fn sign_in(session: &Session, role: &str) {
        session.insert(keys::TOKEN, "tok").await.unwrap();
        session
            .insert(
                keys::USER,
                json!({ "_id": "u1", "username": "ada", "email": "ada@example.com", "role": role }),
            )
            .await
            .unwrap();
    }

    fn parts_with(session: Session) -> Parts {
        let (mut parts, ()) = Request::builder().uri("/").body(()).unwrap().into_parts();
        parts.extensions.insert(session);
        parts
    }

    #[tokio::test]
    async fn test_guest_visitor_is_not_authenticated() {
        let mut parts = parts_with(session());
        let visitor = Visitor::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(!visitor.auth.is_authenticated());
        assert!(visitor.credentials().is_none());
    }

    #[tokio::test]
    async fn test_require_auth_redirects_guests() {
        let mut parts = parts_with(session());
        let rejection = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_require_auth_admits_signed_in() {
        let session = session();
        sign_in(&session, "buyer").await;
        let mut parts = parts_with(session);

        let RequireAuth(signed_in) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(signed_in.user.username, "ada");
        assert_eq!(
            signed_in.credentials.user_id().map(UserId::as_str),
            Some("u1")
        );
    }

    #[tokio::test]
    async fn test_require_admin_checks_role() {
        let session = session();
        sign_in(&session, "seller").await;
        let mut parts = parts_with(session);
        assert!(matches!(
            RequireAdmin::from_request_parts(&mut parts, &()).await,
            Err(AuthRejection::RedirectHome)
        ));

        let session = self::session();
        sign_in(&session, "admin-seller").await;
        let mut parts = parts_with(session);
        assert!(RequireAdmin::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_session_is_server_error() {
        let (mut parts, ()) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let rejection = Visitor::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
