//! `/orders/*` endpoints: the server-side cart, checkout and order history.

use bazaar_core::{OrderId, ProductId};
use reqwest::Method;
use tracing::instrument;

use super::types::{
    AddToCartRequest, CartItem, CartResponse, CheckoutRequest, Order, RemoveFromCartRequest,
};
use super::{ApiClient, Credentials, Result, segment};

impl ApiClient {
    // =========================================================================
    // Cart
    // =========================================================================

    #[instrument(skip(self, credentials))]
    pub async fn get_cart(&self, credentials: &Credentials) -> Result<Vec<CartItem>> {
        let request = self.request(Method::GET, "orders/cart", Some(credentials));
        let cart: CartResponse = self.fetch(request, "orders/cart").await?;
        Ok(cart.items)
    }

    /// Add `quantity` of a product; returns the updated cart.
    #[instrument(skip(self, credentials), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        credentials: &Credentials,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>> {
        let body = AddToCartRequest {
            product_id,
            quantity,
        };
        let request = self
            .request(Method::POST, "orders/cart/add", Some(credentials))
            .json(&body);
        let cart: CartResponse = self.fetch(request, "orders/cart/add").await?;
        Ok(cart.items)
    }

    /// Remove a product's line; returns the updated cart.
    #[instrument(skip(self, credentials), fields(product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        credentials: &Credentials,
        product_id: &ProductId,
    ) -> Result<Vec<CartItem>> {
        let body = RemoveFromCartRequest { product_id };
        let request = self
            .request(Method::POST, "orders/cart/remove", Some(credentials))
            .json(&body);
        let cart: CartResponse = self.fetch(request, "orders/cart/remove").await?;
        Ok(cart.items)
    }

    #[instrument(skip(self, credentials))]
    pub async fn clear_cart(&self, credentials: &Credentials) -> Result<()> {
        let request = self.request(Method::POST, "orders/cart/clear", Some(credentials));
        self.fetch_unit(request, "orders/cart/clear").await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order.
    #[instrument(skip(self, credentials, checkout), fields(lines = checkout.items.len()))]
    pub async fn checkout(
        &self,
        credentials: &Credentials,
        checkout: &CheckoutRequest,
    ) -> Result<Order> {
        let request = self
            .request(Method::POST, "orders/checkout", Some(credentials))
            .json(checkout);
        self.fetch(request, "orders/checkout").await
    }

    /// Orders placed by the signed-in user.
    #[instrument(skip(self, credentials))]
    pub async fn my_orders(&self, credentials: &Credentials) -> Result<Vec<Order>> {
        let request = self.request(Method::GET, "orders/my-orders", Some(credentials));
        self.fetch_list(request, "orders/my-orders", "orders").await
    }

    #[instrument(skip(self, credentials), fields(order_id = %id))]
    pub async fn get_order(&self, credentials: &Credentials, id: &OrderId) -> Result<Order> {
        let path = format!("orders/{}", segment(id.as_str())?);
        let request = self.request(Method::GET, &path, Some(credentials));
        self.fetch(request, &path).await
    }

    /// Cancel one of the signed-in user's orders.
    #[instrument(skip(self, credentials), fields(order_id = %id))]
    pub async fn cancel_order(&self, credentials: &Credentials, id: &OrderId) -> Result<()> {
        let path = format!("orders/{}/cancel", segment(id.as_str())?);
        let request = self.request(Method::POST, &path, Some(credentials));
        self.fetch_unit(request, &path).await
    }
}
