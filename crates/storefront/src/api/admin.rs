//! `/admin/*` endpoints. The backend checks the caller's role.

use bazaar_core::{CategoryId, OrderId, OrderStatus, ProductId};
use reqwest::Method;
use tracing::instrument;

use super::types::{Category, CategoryInput, Order, Product, ProductInput, StatusUpdate};
use super::{ApiClient, Credentials, Result, segment};

impl ApiClient {
    #[instrument(skip(self, credentials, input), fields(name = %input.name))]
    pub async fn admin_create_product(
        &self,
        credentials: &Credentials,
        input: &ProductInput,
    ) -> Result<Product> {
        let request = self
            .request(Method::POST, "admin/products", Some(credentials))
            .json(input);
        self.fetch(request, "admin/products").await
    }

    #[instrument(skip(self, credentials, input), fields(product_id = %id))]
    pub async fn admin_update_product(
        &self,
        credentials: &Credentials,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product> {
        let path = format!("admin/products/{}", segment(id.as_str())?);
        let request = self
            .request(Method::PATCH, &path, Some(credentials))
            .json(input);
        let product = self.fetch(request, &path).await;
        self.invalidate_product(id).await;
        product
    }

    #[instrument(skip(self, credentials), fields(product_id = %id))]
    pub async fn admin_delete_product(
        &self,
        credentials: &Credentials,
        id: &ProductId,
    ) -> Result<()> {
        let path = format!("admin/products/{}", segment(id.as_str())?);
        let request = self.request(Method::DELETE, &path, Some(credentials));
        let result = self.fetch_unit(request, &path).await;
        self.invalidate_product(id).await;
        result
    }

    #[instrument(skip(self, credentials, input), fields(name = %input.name))]
    pub async fn admin_create_category(
        &self,
        credentials: &Credentials,
        input: &CategoryInput,
    ) -> Result<Category> {
        let request = self
            .request(Method::POST, "admin/categories", Some(credentials))
            .json(input);
        self.fetch(request, "admin/categories").await
    }

    #[instrument(skip(self, credentials, input), fields(category_id = %id))]
    pub async fn admin_update_category(
        &self,
        credentials: &Credentials,
        id: &CategoryId,
        input: &CategoryInput,
    ) -> Result<Category> {
        let path = format!("admin/categories/{}", segment(id.as_str())?);
        let request = self
            .request(Method::PATCH, &path, Some(credentials))
            .json(input);
        self.fetch(request, &path).await
    }

    #[instrument(skip(self, credentials), fields(category_id = %id))]
    pub async fn admin_delete_category(
        &self,
        credentials: &Credentials,
        id: &CategoryId,
    ) -> Result<()> {
        let path = format!("admin/categories/{}", segment(id.as_str())?);
        let request = self.request(Method::DELETE, &path, Some(credentials));
        self.fetch_unit(request, &path).await
    }

    /// Every order in the marketplace.
    #[instrument(skip(self, credentials))]
    pub async fn admin_orders(&self, credentials: &Credentials) -> Result<Vec<Order>> {
        let request = self.request(Method::GET, "admin/orders", Some(credentials));
        self.fetch_list(request, "admin/orders", "orders").await
    }

    /// Move an order to `status`.
    #[instrument(skip(self, credentials), fields(order_id = %id, status = %status))]
    pub async fn admin_update_order_status(
        &self,
        credentials: &Credentials,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<()> {
        let path = format!("admin/orders/{}", segment(id.as_str())?);
        let request = self
            .request(Method::PATCH, &path, Some(credentials))
            .json(&StatusUpdate { status });
        self.fetch_unit(request, &path).await
    }
}
