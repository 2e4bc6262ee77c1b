//! Marketplace REST backend client.
//!
//! # Architecture
//!
//! - One `reqwest::Client` shared by every request, with a per-request timeout
//! - Authenticated calls carry `Authorization: Bearer <token>` and `x-user-id`
//! - HTTP 401 surfaces as [`ApiError::Unauthorized`]; the forced logout is done
//!   centrally by `middleware::upstream_auth`, not here
//! - Products are cached by id in `moka` for lazy cart lookups
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::api::ApiClient;
//!
//! let api = ApiClient::new(&config.api)?;
//! let products = api.list_products().await?;
//! let session = api.login("ada@example.com", "hunter2").await?;
//! ```

mod admin;
mod auth;
mod catalog;
mod orders;
pub mod types;
mod users;

use std::borrow::Cow;
use std::sync::Arc;

use bazaar_core::{ProductId, UserId};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::ApiConfig;
use types::{ListEnvelope, Product};

/// Header carrying the signed-in user's id on authenticated calls.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Errors that can occur when talking to the marketplace backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status, with the backend's `error`/`message` if it sent one.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// The backend rejected the token (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The payload parsed as JSON but had the wrong shape.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The payload was not valid JSON for the expected type.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// The message the backend put in its error body, if any.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => Some(message),
            Self::NotFound(message) => Some(message),
            _ => None,
        }
    }

    /// The backend's message, or `fallback`.
    #[must_use]
    pub fn message_or(&self, fallback: &str) -> String {
        self.backend_message().unwrap_or(fallback).to_string()
    }

    /// A message fit to show a visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Status {
                status,
                message: None,
            } => format!("Request failed with status {}", status.as_u16()),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::UnexpectedShape(_) | Self::Parse(_) => {
                "Unexpected response from the server".to_string()
            }
            Self::NotFound(message) => message.clone(),
            Self::Http(err) if err.is_timeout() => {
                "The server took too long to respond".to_string()
            }
            Self::Http(_) => "Could not reach the server".to_string(),
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Result type alias for backend calls.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Token and user id attached to authenticated calls.
#[derive(Clone)]
pub struct Credentials {
    token: SecretString,
    user_id: Option<UserId>,
}

impl Credentials {
    #[must_use]
    pub fn new(token: impl Into<String>, user_id: Option<UserId>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            user_id,
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Error body shape used by the backend (`{ "error": "..." }`).
#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace REST backend.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    products: Cache<ProductId, Product>,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.to_string(),
                products,
            }),
        })
    }

    /// Base URL every endpoint is joined onto (always ends with `/`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Start a request to `path` (relative, no leading slash).
    fn request(
        &self,
        method: Method,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path.trim_start_matches('/'));
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(credentials) = credentials {
            builder = builder.bearer_auth(credentials.token.expose_secret());
            if let Some(user_id) = &credentials.user_id {
                builder = builder.header(USER_ID_HEADER, user_id.as_str());
            }
        }
        builder
    }

    /// Send a request and return the raw body of a successful response.
    async fn execute(&self, builder: RequestBuilder, endpoint: &str) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(endpoint, "Backend rejected credentials");
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.or(b.message))
                .filter(|m| !m.trim().is_empty());

            if status == StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound(
                    message.unwrap_or_else(|| format!("{endpoint} not found")),
                ));
            }

            tracing::warn!(
                endpoint,
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(ApiError::Status { status, message });
        }

        debug!(endpoint, status = %status, "Backend call succeeded");
        Ok(body)
    }

    /// Send a request and decode the response as `T`.
    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, endpoint: &str) -> Result<T> {
        let body = self.execute(builder, endpoint).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                endpoint,
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    async fn fetch_unit(&self, builder: RequestBuilder, endpoint: &str) -> Result<()> {
        self.execute(builder, endpoint).await.map(drop)
    }

    /// Send a request and decode a list, accepting a bare array or an
    /// envelope such as `{ "products": [...] }` or `{ "data": [...] }`.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        what: &str,
    ) -> Result<Vec<T>> {
        let body = self.execute(builder, endpoint).await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        serde_json::from_value::<ListEnvelope<T>>(value)
            .map(ListEnvelope::into_vec)
            .map_err(|e| {
                tracing::warn!(endpoint, error = %e, "Backend list payload has unexpected shape");
                ApiError::UnexpectedShape(format!("expected a list of {what}"))
            })
    }
}

/// Percent-encode a record id for use as one path segment.
///
/// Empty and dot ids are refused; no backend record has one.
fn segment(id: &str) -> Result<Cow<'_, str>> {
    if matches!(id, "" | "." | "..") {
        return Err(ApiError::NotFound(format!("No record with id {id:?}")));
    }
    Ok(urlencoding::encode(id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encodes_separators() {
        assert_eq!(segment("64f1c0").unwrap(), "64f1c0");
        assert_eq!(segment("../admin/orders").unwrap(), "..%2Fadmin%2Forders");
        assert_eq!(segment("a?b#c").unwrap(), "a%3Fb%23c");
        assert!(matches!(segment(".."), Err(ApiError::NotFound(_))));
        assert!(matches!(segment(""), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_encoded_id_stays_in_one_segment() {
        let config = ApiConfig::with_base_url("http://localhost:5000").unwrap();
        let client = ApiClient::new(&config).unwrap();
        let path = format!("orders/{}/cancel", segment("../users/u1").unwrap());
        let request = client.request(Method::POST, &path, None).build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:5000/orders/..%2Fusers%2Fu1/cancel"
        );
    }

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            message: Some("Email already registered".to_string()),
        };
        assert_eq!(err.user_message(), "Email already registered");
        assert_eq!(err.message_or("Registration failed"), "Email already registered");
    }

    #[test]
    fn test_message_or_falls_back() {
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        };
        assert_eq!(err.message_or("Login failed"), "Login failed");
        assert_eq!(err.user_message(), "Request failed with status 500");
        assert_eq!(ApiError::Unauthorized.message_or("Login failed"), "Login failed");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = Credentials::new("tok-very-secret", Some(UserId::new("u1")));
        let debug_output = format!("{credentials:?}");
        assert!(!debug_output.contains("tok-very-secret"));
        assert!(debug_output.contains("u1"));
    }

    #[test]
    fn test_request_joins_base_url() {
        let config = ApiConfig::with_base_url("http://localhost:5000/api").unwrap();
        let client = ApiClient::new(&config).unwrap();
        let request = client
            .request(Method::GET, "/products", None)
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:5000/api/products");
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_request_attaches_credentials() {
        let config = ApiConfig::with_base_url("http://localhost:5000").unwrap();
        let client = ApiClient::new(&config).unwrap();
        let credentials = Credentials::new("tok", Some(UserId::new("u1")));
        let request = client
            .request(Method::GET, "orders/cart", Some(&credentials))
            .build()
            .unwrap();

        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok"
        );
        assert_eq!(request.headers().get(USER_ID_HEADER).unwrap(), "u1");
    }
}
