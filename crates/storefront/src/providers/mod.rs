//! Per-visitor state providers.
//!
//! Every provider reads and writes JSON values in a [`VisitorStore`]: the
//! visitor's `tower-sessions` session in production, an [`InMemoryStore`] in
//! tests. Providers are built at the start of a request from the store
//! (rehydration) and write every mutation straight back to it.
//!
//! | Provider | Store keys |
//! |---|---|
//! | [`auth::Auth`] | `token`, `user`, `userId`, `userRole` |
//! | [`cart::Cart`] | `guest_cart` (guest mode only) |
//! | [`favorites::Favorites`] | `favorites_<userId>` / `favorites_guest` |
//! | [`preferences::Preferences`] | `lang`, `theme` |
//! | [`reviews::Reviews`] | `comments_<productId>` |

pub mod auth;
pub mod cart;
pub mod favorites;
pub mod preferences;
pub mod reviews;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tower_sessions::Session;

pub use auth::{Auth, AuthError};
pub use cart::{Cart, CartError};
pub use favorites::Favorites;
pub use preferences::{Language, Preferences, Theme};
pub use reviews::{Review, ReviewError, Reviews};

/// Store keys shared by the providers.
pub mod keys {
    /// Bearer token of the signed-in user.
    pub const TOKEN: &str = "token";
    /// Serialized signed-in user.
    pub const USER: &str = "user";
    /// Signed-in user's id.
    pub const USER_ID: &str = "userId";
    /// Signed-in user's role.
    pub const USER_ROLE: &str = "userRole";
    /// Guest cart lines.
    pub const GUEST_CART: &str = "guest_cart";
    /// Preferred language.
    pub const LANGUAGE: &str = "lang";
    /// Preferred color theme.
    pub const THEME: &str = "theme";

    /// Every key owned by the auth provider.
    pub const AUTH: [&str; 4] = [TOKEN, USER, USER_ID, USER_ROLE];

    /// Favorites key for a user, or for guests.
    #[must_use]
    pub fn favorites(user_id: Option<&bazaar_core::UserId>) -> String {
        user_id.map_or_else(
            || "favorites_guest".to_string(),
            |id| format!("favorites_{id}"),
        )
    }

    /// Reviews key for a product.
    #[must_use]
    pub fn comments(product_id: &bazaar_core::ProductId) -> String {
        format!("comments_{product_id}")
    }
}

/// Errors from the visitor store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The session backend failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A value could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A per-visitor key/value store of JSON values.
pub trait VisitorStore: Clone + Send + Sync + 'static {
    /// Read the value under `key`.
    fn read_value(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Write `value` under `key`, replacing any previous value.
    fn write_value(
        &self,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete `key`.
    fn remove_key(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl VisitorStore for Session {
    async fn read_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get_value(key).await?)
    }

    async fn write_value(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.insert_value(key, value).await?;
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<(), StoreError> {
        self.remove_value(key).await?;
        Ok(())
    }
}

/// Read and decode the value under `key`.
///
/// A value that no longer decodes as `T` is treated as absent.
///
/// # Errors
///
/// Returns an error if the store itself fails.
pub async fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: VisitorStore,
{
    let Some(value) = store.read_value(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable visitor store entry");
            Ok(None)
        }
    }
}

/// Encode `value` and write it under `key`.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized or the store fails.
pub async fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: VisitorStore,
{
    store.write_value(key, serde_json::to_value(value)?).await
}

/// In-memory [`VisitorStore`] for tests and tools.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently holds a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Snapshot of the raw value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Write a raw value, bypassing serialization.
    pub fn set(&self, key: &str, value: Value) {
        self.entries.lock().insert(key.to_string(), value);
    }
}

impl VisitorStore for InMemoryStore {
    async fn read_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get(key))
    }

    async fn write_value(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set(key, value);
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::{ProductId, UserId};
    use serde_json::json;

    #[test]
    fn test_keys() {
        assert_eq!(keys::favorites(None), "favorites_guest");
        assert_eq!(keys::favorites(Some(&UserId::new("u1"))), "favorites_u1");
        assert_eq!(keys::comments(&ProductId::new("p9")), "comments_p9");
    }

    #[tokio::test]
    async fn test_unreadable_entry_reads_as_absent() {
        let store = InMemoryStore::new();
        store.set("n", json!("not a number"));

        let value: Option<u32> = read_json(&store, "n").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = InMemoryStore::new();
        write_json(&store, "lines", &vec![1, 2, 3]).await.unwrap();

        let value: Option<Vec<u32>> = read_json(&store, "lines").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));

        store.remove_key("lines").await.unwrap();
        assert!(!store.contains_key("lines"));
    }

    #[tokio::test]
    async fn test_session_store() {
        let session = Session::new(None, Arc::new(tower_sessions::MemoryStore::default()), None);
        write_json(&session, keys::THEME, "dark").await.unwrap();

        let theme: Option<String> = read_json(&session, keys::THEME).await.unwrap();
        assert_eq!(theme.as_deref(), Some("dark"));

        session.remove_key(keys::THEME).await.unwrap();
        let theme: Option<String> = read_json(&session, keys::THEME).await.unwrap();
        assert_eq!(theme, None);
    }
}
