//! `/auth/*` endpoints.

use reqwest::Method;
use tracing::instrument;

use super::types::{LoginRequest, LoginResponse, RegisterMeta, RegisterRequest};
use super::{ApiClient, Result};

impl ApiClient {
    /// Create an account. The email is also used as the username.
    #[instrument(skip(self, password, meta))]
    pub async fn register(&self, email: &str, password: &str, meta: &RegisterMeta) -> Result<()> {
        let body = RegisterRequest {
            username: email,
            password,
            email,
            meta,
        };
        let request = self.request(Method::POST, "auth/register", None).json(&body);
        self.fetch_unit(request, "auth/register").await
    }

    /// Exchange credentials for a token and the user record.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest { username, password };
        let request = self.request(Method::POST, "auth/login", None).json(&body);
        self.fetch(request, "auth/login").await
    }
}
