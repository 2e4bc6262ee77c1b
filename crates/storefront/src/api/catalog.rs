//! `/products` and `/categories` endpoints.

use bazaar_core::{CategoryId, ProductId};
use reqwest::Method;
use tracing::{debug, instrument};

use super::types::{Category, CategoryInput, Product, ProductInput, ProductSnapshot};
use super::{ApiClient, Credentials, Result, segment};

impl ApiClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// List every product. Each listed product refreshes its cache entry.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let request = self.request(Method::GET, "products", None);
        let products: Vec<Product> = self.fetch_list(request, "products", "products").await?;

        for product in &products {
            self.inner
                .products
                .insert(product.id.clone(), product.clone())
                .await;
        }
        Ok(products)
    }

    /// Get a product by id, served from cache when fresh.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product> {
        if let Some(product) = self.inner.products.get(id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let path = format!("products/{}", segment(id.as_str())?);
        let request = self.request(Method::GET, &path, None);
        let product: Product = self.fetch(request, &path).await?;

        self.inner
            .products
            .insert(product.id.clone(), product.clone())
            .await;
        Ok(product)
    }

    /// Cart/favorite snapshot of a product.
    pub async fn product_snapshot(&self, id: &ProductId) -> Result<ProductSnapshot> {
        self.get_product(id).await.map(|product| product.snapshot())
    }

    /// List a seller's new product.
    #[instrument(skip(self, credentials, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        credentials: &Credentials,
        input: &ProductInput,
    ) -> Result<Product> {
        let request = self
            .request(Method::POST, "products", Some(credentials))
            .json(input);
        self.fetch(request, "products").await
    }

    #[instrument(skip(self, credentials, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        credentials: &Credentials,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product> {
        let path = format!("products/{}", segment(id.as_str())?);
        let request = self
            .request(Method::PATCH, &path, Some(credentials))
            .json(input);
        let product = self.fetch(request, &path).await;
        self.invalidate_product(id).await;
        product
    }

    #[instrument(skip(self, credentials), fields(product_id = %id))]
    pub async fn delete_product(&self, credentials: &Credentials, id: &ProductId) -> Result<()> {
        let path = format!("products/{}", segment(id.as_str())?);
        let request = self.request(Method::DELETE, &path, Some(credentials));
        let result = self.fetch_unit(request, &path).await;
        self.invalidate_product(id).await;
        result
    }

    /// Drop a product from the cache.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner.products.invalidate(id).await;
    }

    // =========================================================================
    // Categories
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let request = self.request(Method::GET, "categories", None);
        self.fetch_list(request, "categories", "categories").await
    }

    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn get_category(&self, id: &CategoryId) -> Result<Category> {
        let path = format!("categories/{}", segment(id.as_str())?);
        let request = self.request(Method::GET, &path, None);
        self.fetch(request, &path).await
    }

    /// Products filed under a category.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category_products(&self, id: &CategoryId) -> Result<Vec<Product>> {
        let path = format!("categories/{}/products", segment(id.as_str())?);
        let request = self.request(Method::GET, &path, None);
        self.fetch_list(request, &path, "products").await
    }

    #[instrument(skip(self, credentials, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        credentials: &Credentials,
        input: &CategoryInput,
    ) -> Result<Category> {
        let request = self
            .request(Method::POST, "categories", Some(credentials))
            .json(input);
        self.fetch(request, "categories").await
    }

    #[instrument(skip(self, credentials, input), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        credentials: &Credentials,
        id: &CategoryId,
        input: &CategoryInput,
    ) -> Result<Category> {
        let path = format!("categories/{}", segment(id.as_str())?);
        let request = self
            .request(Method::PATCH, &path, Some(credentials))
            .json(input);
        self.fetch(request, &path).await
    }

    #[instrument(skip(self, credentials), fields(category_id = %id))]
    pub async fn delete_category(&self, credentials: &Credentials, id: &CategoryId) -> Result<()> {
        let path = format!("categories/{}", segment(id.as_str())?);
        let request = self.request(Method::DELETE, &path, Some(credentials));
        self.fetch_unit(request, &path).await
    }
}
