//! `/users/*` endpoints.

use bazaar_core::UserId;
use reqwest::Method;
use tracing::instrument;

use super::types::{MessageResponse, PasswordChange, ProfileUpdate, User};
use super::{ApiClient, Credentials, Result, segment};

impl ApiClient {
    #[instrument(skip(self, credentials))]
    pub async fn profile(&self, credentials: &Credentials) -> Result<User> {
        let request = self.request(Method::GET, "users/profile", Some(credentials));
        self.fetch(request, "users/profile").await
    }

    #[instrument(skip(self, credentials, update))]
    pub async fn update_profile(
        &self,
        credentials: &Credentials,
        update: &ProfileUpdate,
    ) -> Result<User> {
        let request = self
            .request(Method::PATCH, "users/profile", Some(credentials))
            .json(update);
        self.fetch(request, "users/profile").await
    }

    #[instrument(skip(self, credentials, change))]
    pub async fn change_password(
        &self,
        credentials: &Credentials,
        change: &PasswordChange,
    ) -> Result<()> {
        let request = self
            .request(Method::POST, "users/change-password", Some(credentials))
            .json(change);
        self.fetch_unit(request, "users/change-password").await
    }

    #[instrument(skip(self, credentials), fields(user_id = %id))]
    pub async fn get_user(&self, credentials: &Credentials, id: &UserId) -> Result<User> {
        let path = format!("users/{}", segment(id.as_str())?);
        let request = self.request(Method::GET, &path, Some(credentials));
        self.fetch(request, &path).await
    }

    /// Upgrade the signed-in buyer to a seller.
    #[instrument(skip(self, credentials))]
    pub async fn become_seller(&self, credentials: &Credentials) -> Result<MessageResponse> {
        let request = self.request(Method::POST, "users/become-seller", Some(credentials));
        let body = self.execute(request, "users/become-seller").await?;
        // Some deployments answer with an empty body.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}
