//! Bazaar Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused. [`app`] assembles the full router
//! with its middleware stack; the binary only adds Sentry, the session
//! store and the listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod providers;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Directory served under `/static`, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the storefront router around a session layer.
///
/// See [`middleware`] for the layer order.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes::routes()
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::upstream_auth_middleware,
        ))
        .layer(sessions)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use crate::config::{ApiConfig, StorefrontConfig};
    use crate::middleware::session_layer;

    // Nothing listens on port 9; backend calls fail fast.
    const DEAD_BACKEND: &str = "http://127.0.0.1:9";

    fn test_app() -> Router {
        let config = StorefrontConfig::local(ApiConfig::with_base_url(DEAD_BACKEND).unwrap());
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(
                "postgres://bazaar@127.0.0.1:9/bazaar"
                    .parse()
                    .unwrap(),
            );
        let state = AppState::new(config, pool).unwrap();
        app(state, session_layer(MemoryStore::default(), false))
    }

    async fn get(uri: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn test_readiness_reports_unreachable_database() {
        let response = get("/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_protected_pages_redirect_guests_to_login() {
        for uri in ["/checkout", "/orders", "/profile", "/sell", "/admin"] {
            let response = get(uri).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/auth/login", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_guest_pages_render() {
        for uri in ["/auth/login", "/auth/register", "/cart", "/favorites"] {
            let response = get(uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_catalog_failure_is_shown_inline() {
        let response = get("/products").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_theme_toggle_sets_cookie_and_redirects_back() {
        let response = test_app()
            .oneshot(
                Request::post("/preferences/theme")
                    .header(header::REFERER, "http://localhost:3000/cart")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/cart");
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn test_login_posts_are_rate_limited() {
        let app = test_app();
        let mut statuses = Vec::new();
        for _ in 0..7 {
            let response = app
                .clone()
                .oneshot(
                    Request::post("/auth/login")
                        .header("x-forwarded-for", "203.0.113.7")
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from("username=&password="))
                        .unwrap(),
                )
                .await
                .unwrap();
            statuses.push(response.status());
        }
        assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(statuses[0], StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_local_config_is_not_secure() {
        let config = StorefrontConfig::local(ApiConfig::with_base_url(DEAD_BACKEND).unwrap());
        assert!(!config.is_secure());
        assert_eq!(config.socket_addr().port(), 3000);
    }
}
