//! Proxy configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `API_PROXY_TARGET` - Backend every request is forwarded to. When unset
//!   the proxy still starts and answers every request with a 500.
//! - `API_PROXY_PREFIX` - Path prefix stripped before forwarding
//!   (default: `/.netlify/functions/api`)
//! - `API_PROXY_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PROXY_PORT` - Listen port (default: 8888)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Prefix of the serverless function path the browser calls.
pub const DEFAULT_PREFIX: &str = "/.netlify/functions/api";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Backend base URL, if configured
    pub target: Option<Url>,
    /// Path prefix removed from incoming paths
    pub prefix: String,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ProxyConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let target = get_optional_env("API_PROXY_TARGET")
            .map(|raw| parse_target(&raw))
            .transpose()?;

        Ok(Self {
            target,
            prefix: get_optional_env("API_PROXY_PREFIX")
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            host: get_parsed_env("API_PROXY_HOST", "127.0.0.1")?,
            port: get_parsed_env("API_PROXY_PORT", "8888")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration forwarding to `target` with the default prefix.
    #[must_use]
    pub fn with_target(target: Option<Url>) -> Self {
        Self {
            target,
            prefix: DEFAULT_PREFIX.to_string(),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8888,
            sentry_dsn: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse the backend URL; only http(s) is accepted.
///
/// # Errors
///
/// Returns an error for relative URLs and other schemes.
pub fn parse_target(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("API_PROXY_TARGET".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "API_PROXY_TARGET".to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_parsed_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_optional_env(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
