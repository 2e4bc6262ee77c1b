//! Bazaar API proxy.
//!
//! Forwards every request under the function prefix to the REST backend and
//! returns the upstream answer unchanged:
//!
//! - the prefix is stripped (an empty remainder becomes `/`) and the query
//!   string is kept
//! - method, headers and body are forwarded, except `Host` and the
//!   connection-level headers
//! - redirects are returned to the caller, never followed
//! - status, body and `Content-Type` come back verbatim, with permissive
//!   CORS headers added

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, Method, header},
    response::{IntoResponse, Response},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Request headers never forwarded.
const DROPPED_HEADERS: [HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Shared proxy state.
#[derive(Clone)]
pub struct ProxyState {
    inner: Arc<ProxyStateInner>,
}

struct ProxyStateInner {
    config: ProxyConfig,
    client: reqwest::Client,
}

impl ProxyState {
    /// Create the proxy state with a client that never follows redirects.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ProxyConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            inner: Arc::new(ProxyStateInner { config, client }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }
}

/// Path forwarded upstream: `path` without `prefix`, never empty.
///
/// The prefix is only stripped at a segment boundary.
#[must_use]
pub fn proxied_path<'a>(path: &'a str, prefix: &str) -> &'a str {
    match path.strip_prefix(prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Full upstream URL for a request.
#[must_use]
pub fn upstream_url(target: &url::Url, path: &str, query: Option<&str>) -> String {
    let base = target.as_str().trim_end_matches('/');
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{base}{path}?{query}"),
        None => format!("{base}{path}"),
    }
}

fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in &DROPPED_HEADERS {
        forwarded.remove(name);
    }
    forwarded
}

/// Forward one request.
#[instrument(skip(state, request), fields(method = %request.method(), path = %request.uri().path()))]
pub async fn forward(State(state): State<ProxyState>, request: Request) -> Result<Response> {
    let config = state.config();
    let target = config.target.as_ref().ok_or(ProxyError::NotConfigured)?;

    let (parts, body) = request.into_parts();
    let path = proxied_path(parts.uri.path(), &config.prefix);
    let url = upstream_url(target, path, parts.uri.query());
    let body: Bytes = axum::body::to_bytes(body, MAX_BODY_BYTES).await?;

    let mut upstream = state
        .inner
        .client
        .request(parts.method.clone(), &url)
        .headers(forwarded_headers(&parts.headers));
    if !body.is_empty() {
        upstream = upstream.body(body);
    }

    let response = upstream.send().await?;
    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let body = response.bytes().await?;
    tracing::debug!(status = status.as_u16(), upstream = %url, "Forwarded");

    let mut proxied = (status, Body::from(body)).into_response();
    if let Some(content_type) = content_type {
        proxied.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    Ok(proxied)
}

/// CORS policy: any origin, the methods and headers the storefront sends.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
        ])
}

/// Build the proxy router. Every path is forwarded.
pub fn app(state: ProxyState) -> Router {
    Router::new()
        .fallback(forward)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
