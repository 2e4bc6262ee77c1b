//! Signed-in user state.
//!
//! The token and user record live in the visitor store under `token`,
//! `user`, `userId` and `userRole`. [`Auth::rehydrate`] rebuilds the state at
//! the start of every request; a token without a readable user record counts
//! as signed out.

use bazaar_core::Role;
use thiserror::Error;
use tracing::instrument;

use super::{StoreError, VisitorStore, keys, read_json, write_json};
use crate::api::types::{RegisterMeta, User};
use crate::api::{ApiClient, ApiError, Credentials};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Errors from sign-in, registration and sign-out.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend refused the request; `message` is what the visitor sees.
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: ApiError,
    },

    /// The visitor store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    fn rejected(source: ApiError, fallback: &str) -> Self {
        Self::Rejected {
            message: source.message_or(fallback),
            source,
        }
    }

    /// Message fit to show on the login or registration form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Store(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

#[derive(Clone)]
struct SignedIn {
    credentials: Credentials,
    user: User,
}

/// Auth state of one visitor.
pub struct Auth<S> {
    store: S,
    current: Option<SignedIn>,
}

impl<S: VisitorStore> Auth<S> {
    /// Rebuild auth state from the visitor store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn rehydrate(store: S) -> Result<Self, StoreError> {
        let token: Option<String> = read_json(&store, keys::TOKEN).await?;
        let user: Option<User> = read_json(&store, keys::USER).await?;

        let current = match (token, user) {
            (Some(token), Some(user)) if !token.is_empty() => Some(SignedIn {
                credentials: Credentials::new(token, Some(user.id.clone())),
                user,
            }),
            _ => None,
        };

        Ok(Self { store, current })
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|c| &c.user)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Role of the signed-in user, `None` for guests.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user().map(|user| user.role)
    }

    /// Credentials for authenticated backend calls.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.current.as_ref().map(|c| &c.credentials)
    }

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the backend's message (or
    /// "Login failed") when the backend refuses, or a store error.
    #[instrument(skip(self, api, password))]
    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<&User, AuthError> {
        self.sign_in(api, username, password, LOGIN_FAILED).await
    }

    /// Create an account, then sign in with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the backend's message (or
    /// "Registration failed"), or a store error.
    #[instrument(skip(self, api, password, meta))]
    pub async fn register(
        &mut self,
        api: &ApiClient,
        email: &str,
        password: &str,
        meta: &RegisterMeta,
    ) -> Result<&User, AuthError> {
        api.register(email, password, meta)
            .await
            .map_err(|e| AuthError::rejected(e, REGISTRATION_FAILED))?;
        self.sign_in(api, email, password, REGISTRATION_FAILED).await
    }

    async fn sign_in(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
        fallback: &str,
    ) -> Result<&User, AuthError> {
        let response = api
            .login(username, password)
            .await
            .map_err(|e| AuthError::rejected(e, fallback))?;

        write_json(&self.store, keys::TOKEN, &response.token).await?;
        self.persist_user(&response.user).await?;

        tracing::info!(user_id = %response.user.id, role = %response.user.role, "Signed in");
        let signed_in = self.current.insert(SignedIn {
            credentials: Credentials::new(response.token, Some(response.user.id.clone())),
            user: response.user,
        });
        Ok(&signed_in.user)
    }

    /// Replace the stored user record, e.g. after a profile edit or a role
    /// change. Does nothing for guests.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn refresh_user(&mut self, user: User) -> Result<(), StoreError> {
        if self.current.is_none() {
            return Ok(());
        }
        self.persist_user(&user).await?;
        if let Some(current) = self.current.as_mut() {
            current.user = user;
        }
        Ok(())
    }

    async fn persist_user(&self, user: &User) -> Result<(), StoreError> {
        write_json(&self.store, keys::USER, user).await?;
        write_json(&self.store, keys::USER_ID, &user.id).await?;
        write_json(&self.store, keys::USER_ROLE, user.role.as_str()).await
    }

    /// Sign out: remove every auth key. Cart and favorites are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn logout(&mut self) -> Result<(), StoreError> {
        for key in keys::AUTH {
            self.store.remove_key(key).await?;
        }
        if let Some(previous) = self.current.take() {
            tracing::info!(user_id = %previous.user.id, "Signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::providers::InMemoryStore;
    use serde_json::json;

    fn signed_in_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.set(keys::TOKEN, json!("tok-1"));
        store.set(
            keys::USER,
            json!({ "id": "u1", "username": "ada", "email": "ada@example.com", "role": "seller" }),
        );
        store.set(keys::USER_ID, json!("u1"));
        store.set(keys::USER_ROLE, json!("seller"));
        store
    }

    #[tokio::test]
    async fn test_rehydrate_signed_in() {
        let auth = Auth::rehydrate(signed_in_store()).await.unwrap();

        assert!(auth.is_authenticated());
        assert_eq!(auth.user().unwrap().username, "ada");
        assert_eq!(auth.role(), Some(Role::Seller));
        assert_eq!(auth.credentials().unwrap().user_id().unwrap().as_str(), "u1");
    }

    #[tokio::test]
    async fn test_token_without_readable_user_is_signed_out() {
        let store = InMemoryStore::new();
        store.set(keys::TOKEN, json!("tok-1"));
        store.set(keys::USER, json!("{not json"));

        let auth = Auth::rehydrate(store).await.unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.credentials().is_none());
    }

    #[tokio::test]
    async fn test_logout_removes_auth_keys_only() {
        let store = signed_in_store();
        store.set(keys::GUEST_CART, json!([{ "productId": "p1", "quantity": 1 }]));
        store.set("favorites_u1", json!([]));

        let mut auth = Auth::rehydrate(store.clone()).await.unwrap();
        auth.logout().await.unwrap();

        assert!(!auth.is_authenticated());
        assert!(auth.user().is_none());
        for key in keys::AUTH {
            assert!(!store.contains_key(key), "{key} should be removed");
        }
        assert!(store.contains_key(keys::GUEST_CART));
        assert!(store.contains_key("favorites_u1"));

        let again = Auth::rehydrate(store).await.unwrap();
        assert!(!again.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_user_updates_role() {
        let store = signed_in_store();
        let mut auth = Auth::rehydrate(store.clone()).await.unwrap();

        let mut user = auth.user().unwrap().clone();
        user.role = Role::AdminSeller;
        auth.refresh_user(user).await.unwrap();

        assert_eq!(auth.role(), Some(Role::AdminSeller));
        assert_eq!(store.get(keys::USER_ROLE), Some(json!("admin-seller")));
    }

    #[test]
    fn test_rejected_uses_backend_message() {
        let err = AuthError::rejected(
            ApiError::Status {
                status: reqwest::StatusCode::BAD_REQUEST,
                message: Some("Invalid credentials".to_string()),
            },
            LOGIN_FAILED,
        );
        assert_eq!(err.user_message(), "Invalid credentials");

        let err = AuthError::rejected(ApiError::Unauthorized, LOGIN_FAILED);
        assert_eq!(err.user_message(), "Login failed");
    }
}
