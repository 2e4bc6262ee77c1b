//! Per-user favorites list, newest first.
//!
//! Stored under `favorites_<userId>` (or `favorites_guest`) and never sent to
//! the backend. Un-favoriting through [`Favorites::toggle_favorite`] remembers
//! where the product sat so that toggling it back restores its position.

use bazaar_core::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{StoreError, VisitorStore, keys, read_json, write_json};
use crate::api::types::ProductSnapshot;

/// Position a product held before it was toggled off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemovedAt {
    product_id: ProductId,
    index: usize,
}

/// Favorites of one visitor.
pub struct Favorites<S> {
    store: S,
    key: String,
    items: Vec<ProductSnapshot>,
}

impl<S: VisitorStore> Favorites<S> {
    /// Load the favorites of `user_id`, or of the guest.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn load(store: S, user_id: Option<&UserId>) -> Result<Self, StoreError> {
        let key = keys::favorites(user_id);
        let items = read_json(&store, &key).await?.unwrap_or_default();
        Ok(Self { store, key, items })
    }

    #[must_use]
    pub fn favorites(&self) -> &[ProductSnapshot] {
        &self.items
    }

    #[must_use]
    pub fn favorites_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_favorited(&self, product_id: &ProductId) -> bool {
        self.position(product_id).is_some()
    }

    /// Prepend a product. Already-favorited products are left where they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn add_favorite(&mut self, product: ProductSnapshot) -> Result<(), StoreError> {
        if self.is_favorited(&product.id) {
            return Ok(());
        }
        self.items.insert(0, product);
        self.persist().await
    }

    /// Remove a product; unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn remove_favorite(&mut self, product_id: &ProductId) -> Result<(), StoreError> {
        let Some(index) = self.position(product_id) else {
            return Ok(());
        };
        self.items.remove(index);
        self.persist().await
    }

    /// Favorite or un-favorite a product. Returns whether it is now a favorite.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn toggle_favorite(&mut self, product: ProductSnapshot) -> Result<bool, StoreError> {
        if let Some(index) = self.position(&product.id) {
            self.items.remove(index);
            self.persist().await?;
            let removed = RemovedAt {
                product_id: product.id,
                index,
            };
            write_json(&self.store, &self.undo_key(), &removed).await?;
            return Ok(false);
        }

        let undo_key = self.undo_key();
        let removed: Option<RemovedAt> = read_json(&self.store, &undo_key).await?;
        let index = match removed {
            Some(removed) if removed.product_id == product.id => removed.index.min(self.items.len()),
            _ => 0,
        };
        self.items.insert(index, product);
        self.persist().await?;
        self.store.remove_key(&undo_key).await?;
        Ok(true)
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items.iter().position(|p| &p.id == product_id)
    }

    fn undo_key(&self) -> String {
        format!("{}_removed", self.key)
    }

    async fn persist(&self) -> Result<(), StoreError> {
        write_json(&self.store, &self.key, &self.items).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::providers::InMemoryStore;
    use bazaar_core::Price;

    fn product(id: &str) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: id.to_uppercase(),
            price: Price::from_units(10),
            image: None,
        }
    }

    fn ids<S: VisitorStore>(favorites: &Favorites<S>) -> Vec<&str> {
        favorites.favorites().iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_add_prepends_and_ignores_duplicates() {
        let store = InMemoryStore::new();
        let mut favorites = Favorites::load(store, None).await.unwrap();

        favorites.add_favorite(product("a")).await.unwrap();
        favorites.add_favorite(product("b")).await.unwrap();
        favorites.add_favorite(product("a")).await.unwrap();

        assert_eq!(ids(&favorites), ["b", "a"]);
        assert_eq!(favorites.favorites_count(), 2);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_list_for_new_product() {
        let store = InMemoryStore::new();
        let mut favorites = Favorites::load(store, None).await.unwrap();
        favorites.add_favorite(product("a")).await.unwrap();
        favorites.add_favorite(product("b")).await.unwrap();
        let original = favorites.favorites().to_vec();

        assert!(favorites.toggle_favorite(product("c")).await.unwrap());
        assert!(!favorites.toggle_favorite(product("c")).await.unwrap());

        assert_eq!(favorites.favorites(), original.as_slice());
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_position_of_existing_favorite() {
        let store = InMemoryStore::new();
        let mut favorites = Favorites::load(store.clone(), None).await.unwrap();
        for id in ["a", "b", "c"] {
            favorites.add_favorite(product(id)).await.unwrap();
        }
        let original = favorites.favorites().to_vec();

        assert!(!favorites.toggle_favorite(product("b")).await.unwrap());
        assert_eq!(ids(&favorites), ["c", "a"]);

        // A fresh request sees the same state.
        let mut favorites = Favorites::load(store, None).await.unwrap();
        assert!(favorites.toggle_favorite(product("b")).await.unwrap());
        assert_eq!(favorites.favorites(), original.as_slice());
    }

    #[tokio::test]
    async fn test_lists_are_per_user() {
        let store = InMemoryStore::new();
        let ada = UserId::new("ada");

        let mut mine = Favorites::load(store.clone(), Some(&ada)).await.unwrap();
        mine.add_favorite(product("a")).await.unwrap();

        let guest = Favorites::load(store.clone(), None).await.unwrap();
        assert_eq!(guest.favorites_count(), 0);
        assert!(store.contains_key("favorites_ada"));
        assert!(!store.contains_key("favorites_guest"));
    }

    #[tokio::test]
    async fn test_remove_favorite() {
        let store = InMemoryStore::new();
        let mut favorites = Favorites::load(store, None).await.unwrap();
        favorites.add_favorite(product("a")).await.unwrap();

        favorites.remove_favorite(&ProductId::new("zzz")).await.unwrap();
        assert!(favorites.is_favorited(&ProductId::new("a")));

        favorites.remove_favorite(&ProductId::new("a")).await.unwrap();
        assert!(!favorites.is_favorited(&ProductId::new("a")));
    }
}
