//! Dual-mode shopping cart.
//!
//! Signed-in visitors use the backend cart: every mutation is a backend call
//! and the response replaces the local lines. Guests keep their lines in the
//! visitor store under `guest_cart`. The two carts are never merged.

use bazaar_core::{Price, ProductId};
use thiserror::Error;
use tracing::instrument;

use super::{StoreError, VisitorStore, keys, read_json, write_json};
use crate::api::types::{CartItem, ProductSnapshot};
use crate::api::{ApiClient, ApiError, Credentials};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantities must be at least one.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// The backend cart call failed.
    #[error("Cart request failed: {0}")]
    Api(#[from] ApiError),

    /// The guest cart could not be read or written.
    #[error("Guest cart unavailable: {0}")]
    Store(#[from] StoreError),
}

impl CartError {
    /// Message fit to show a visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidQuantity => self.to_string(),
            Self::Api(err) => err.user_message(),
            Self::Store(_) => "Your cart could not be saved. Please try again.".to_string(),
        }
    }
}

/// A cart line with the product data needed to display it.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub item: CartItem,
    /// `None` when the product could not be looked up.
    pub product: Option<ProductSnapshot>,
}

impl ResolvedLine {
    #[must_use]
    pub fn unit_price(&self) -> Price {
        self.product
            .as_ref()
            .map(|p| p.price)
            .or_else(|| self.item.unit_price())
            .unwrap_or(Price::ZERO)
    }

    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price().times(self.item.quantity)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.product
            .as_ref()
            .map_or("Product", |p| p.name.as_str())
    }
}

/// Cart state of one visitor.
pub struct Cart<S> {
    store: S,
    api: ApiClient,
    credentials: Option<Credentials>,
    items: Vec<CartItem>,
    error: Option<String>,
}

impl<S: VisitorStore> Cart<S> {
    /// Load the cart for the current auth state: the backend cart when
    /// `credentials` are present, the guest cart otherwise.
    ///
    /// A failed load leaves the cart empty with [`Cart::error`] set.
    ///
    /// # Errors
    ///
    /// Returns the backend's 401 when the credentials were rejected; the
    /// visitor has to sign in again rather than see an empty cart.
    pub async fn load(
        store: S,
        api: ApiClient,
        credentials: Option<Credentials>,
    ) -> Result<Self, CartError> {
        let mut cart = Self {
            store,
            api,
            credentials,
            items: Vec::new(),
            error: None,
        };
        match cart.fetch_cart().await {
            Ok(_) => Ok(cart),
            Err(CartError::Api(ApiError::Unauthorized)) => {
                Err(CartError::Api(ApiError::Unauthorized))
            }
            Err(e) => {
                tracing::warn!(error = %e, guest = cart.is_guest(), "Failed to load cart");
                Ok(cart)
            }
        }
    }

    /// Current lines.
    #[must_use]
    pub fn cart(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub const fn is_guest(&self) -> bool {
        self.credentials.is_none()
    }

    /// Message from the last failed operation, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reload lines from the backend or the guest store.
    ///
    /// # Errors
    ///
    /// Returns the failure after emptying the cart.
    #[instrument(skip(self), fields(guest = self.is_guest()))]
    pub async fn fetch_cart(&mut self) -> Result<&[CartItem], CartError> {
        let result = match &self.credentials {
            Some(credentials) => self.api.get_cart(credentials).await.map_err(CartError::from),
            None => self.read_guest_cart().await,
        };
        match result {
            Ok(items) => Ok(self.replace(items)),
            Err(e) => {
                self.items.clear();
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// Guest lines for the same product accumulate.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for zero, or the backend/store
    /// failure. Local state is unchanged on failure.
    #[instrument(skip(self), fields(guest = self.is_guest()))]
    pub async fn add_to_cart(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<&[CartItem], CartError> {
        if quantity == 0 {
            return Err(self.fail(CartError::InvalidQuantity));
        }

        let result = match &self.credentials {
            Some(credentials) => self
                .api
                .add_to_cart(credentials, product_id, quantity)
                .await
                .map_err(CartError::from),
            None => self.add_guest_line(product_id, quantity).await,
        };
        self.settle(result)
    }

    /// Remove a product's line. Unknown ids leave the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns the backend/store failure.
    #[instrument(skip(self), fields(guest = self.is_guest()))]
    pub async fn remove_from_cart(&mut self, product_id: &ProductId) -> Result<&[CartItem], CartError> {
        let result = match &self.credentials {
            Some(credentials) => self
                .api
                .remove_from_cart(credentials, product_id)
                .await
                .map_err(CartError::from),
            None => self.remove_guest_line(product_id).await,
        };
        self.settle(result)
    }

    /// Empty the cart. In guest mode this removes the `guest_cart` key.
    ///
    /// # Errors
    ///
    /// Returns the backend/store failure.
    #[instrument(skip(self), fields(guest = self.is_guest()))]
    pub async fn clear_cart(&mut self) -> Result<(), CartError> {
        let result = match &self.credentials {
            Some(credentials) => self.api.clear_cart(credentials).await.map_err(CartError::from),
            None => self
                .store
                .remove_key(keys::GUEST_CART)
                .await
                .map_err(CartError::from),
        };
        self.settle(result.map(|()| Vec::new())).map(drop)
    }

    /// Pair each line with product data, looking up lines the backend did
    /// not populate. Failed lookups yield `product: None`.
    pub async fn resolve_lines(&self) -> Vec<ResolvedLine> {
        let mut lines = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let product = match &item.product {
                Some(snapshot) => Some(snapshot.clone()),
                None => match self.api.product_snapshot(&item.product_id).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        tracing::warn!(product_id = %item.product_id, error = %e, "Cart product lookup failed");
                        None
                    }
                },
            };
            lines.push(ResolvedLine {
                item: item.clone(),
                product,
            });
        }
        lines
    }

    // =========================================================================
    // Guest cart
    // =========================================================================

    async fn read_guest_cart(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(read_json(&self.store, keys::GUEST_CART)
            .await?
            .unwrap_or_default())
    }

    async fn add_guest_line(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, CartError> {
        let mut items = self.read_guest_cart().await?;
        match items.iter_mut().find(|item| &item.product_id == product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => items.push(CartItem::new(product_id.clone(), quantity)),
        }
        write_json(&self.store, keys::GUEST_CART, &items).await?;
        Ok(items)
    }

    async fn remove_guest_line(&self, product_id: &ProductId) -> Result<Vec<CartItem>, CartError> {
        let mut items = self.read_guest_cart().await?;
        let before = items.len();
        items.retain(|item| &item.product_id != product_id);
        if items.len() != before {
            write_json(&self.store, keys::GUEST_CART, &items).await?;
        }
        Ok(items)
    }

    // =========================================================================
    // State
    // =========================================================================

    fn replace(&mut self, items: Vec<CartItem>) -> &[CartItem] {
        self.items = items;
        self.error = None;
        &self.items
    }

    fn fail(&mut self, error: CartError) -> CartError {
        self.error = Some(error.user_message());
        error
    }

    fn settle(&mut self, result: Result<Vec<CartItem>, CartError>) -> Result<&[CartItem], CartError> {
        match result {
            Ok(items) => Ok(self.replace(items)),
            Err(e) => Err(self.fail(e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::providers::InMemoryStore;
    use serde_json::json;

    fn api() -> ApiClient {
        // Guest mode never calls the backend.
        ApiClient::new(&ApiConfig::with_base_url("http://127.0.0.1:9").unwrap()).unwrap()
    }

    async fn guest_cart(store: &InMemoryStore) -> Cart<InMemoryStore> {
        Cart::load(store.clone(), api(), None).await.unwrap()
    }

    #[tokio::test]
    async fn test_guest_add_accumulates_quantity() {
        let store = InMemoryStore::new();
        let mut cart = guest_cart(&store).await;
        let lamp = ProductId::new("lamp");

        cart.add_to_cart(&lamp, 2).await.unwrap();
        cart.add_to_cart(&ProductId::new("rug"), 1).await.unwrap();
        let items = cart.add_to_cart(&lamp, 3).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, lamp);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(cart.cart_count(), 2);
        assert_eq!(cart.total_quantity(), 6);

        let reloaded = guest_cart(&store).await;
        assert_eq!(reloaded.cart(), cart.cart());
    }

    #[tokio::test]
    async fn test_guest_add_zero_is_rejected() {
        let store = InMemoryStore::new();
        let mut cart = guest_cart(&store).await;

        let err = cart.add_to_cart(&ProductId::new("lamp"), 0).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity));
        assert!(cart.cart().is_empty());
        assert!(!store.contains_key(keys::GUEST_CART));
        assert!(cart.error().is_some());
    }

    #[tokio::test]
    async fn test_guest_remove_unknown_id_is_noop() {
        let store = InMemoryStore::new();
        let mut cart = guest_cart(&store).await;
        cart.add_to_cart(&ProductId::new("lamp"), 1).await.unwrap();
        let before = cart.cart().to_vec();

        let after = cart.remove_from_cart(&ProductId::new("missing")).await.unwrap();
        assert_eq!(after, before.as_slice());
    }

    #[tokio::test]
    async fn test_guest_remove_line() {
        let store = InMemoryStore::new();
        let mut cart = guest_cart(&store).await;
        cart.add_to_cart(&ProductId::new("lamp"), 1).await.unwrap();
        cart.add_to_cart(&ProductId::new("rug"), 1).await.unwrap();

        let items = cart.remove_from_cart(&ProductId::new("lamp")).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id.as_str(), "rug");
        assert_eq!(
            store.get(keys::GUEST_CART),
            Some(json!([{ "productId": "rug", "quantity": 1 }]))
        );
    }

    #[tokio::test]
    async fn test_guest_clear_removes_key() {
        let store = InMemoryStore::new();
        let mut cart = guest_cart(&store).await;
        cart.add_to_cart(&ProductId::new("lamp"), 4).await.unwrap();

        cart.clear_cart().await.unwrap();
        assert!(cart.cart().is_empty());
        assert_eq!(cart.cart_count(), 0);
        assert!(!store.contains_key(keys::GUEST_CART));
    }

    #[tokio::test]
    async fn test_corrupt_guest_cart_loads_empty() {
        let store = InMemoryStore::new();
        store.set(keys::GUEST_CART, json!({ "oops": true }));

        let cart = guest_cart(&store).await;
        assert!(cart.cart().is_empty());
        assert!(cart.error().is_none());
    }

    #[tokio::test]
    async fn test_signed_in_load_failure_leaves_empty_cart_with_error() {
        let store = InMemoryStore::new();
        store.set(keys::GUEST_CART, json!([{ "productId": "lamp", "quantity": 1 }]));
        let credentials = Credentials::new("tok", None);

        let cart = Cart::load(store.clone(), api(), Some(credentials)).await.unwrap();
        assert!(!cart.is_guest());
        assert!(cart.cart().is_empty());
        assert!(cart.error().is_some());
        // The guest cart is left untouched.
        assert!(store.contains_key(keys::GUEST_CART));
    }

    #[test]
    fn test_resolved_line_totals() {
        let line = ResolvedLine {
            item: CartItem::new(ProductId::new("lamp"), 3),
            product: Some(ProductSnapshot {
                id: ProductId::new("lamp"),
                name: "Lamp".to_string(),
                price: Price::from_units(20),
                image: None,
            }),
        };
        assert_eq!(line.line_total(), Price::from_units(60));
        assert_eq!(line.name(), "Lamp");

        let unknown = ResolvedLine {
            item: CartItem::new(ProductId::new("gone"), 1),
            product: None,
        };
        assert_eq!(unknown.unit_price(), Price::ZERO);
        assert_eq!(unknown.name(), "Product");
    }
}
