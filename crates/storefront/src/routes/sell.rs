//! Seller dashboard: list, edit and delete products, add categories.
//!
//! The product form and its view model are shared with the admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use bazaar_core::{CategoryId, Price, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::views::{Flash, SelectOption, Shell, redirect_error, redirect_notice};
use crate::api::types::{Category, CategoryInput, Product, ProductInput};
use crate::error::{Result, inline_message};
use crate::middleware::RequireAuth;
use crate::state::AppState;

const SELL_PATH: &str = "/sell";
const PRODUCTS_PATH: &str = "/sell/products";

// =============================================================================
// Product form
// =============================================================================

/// Product create/update form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub image: String,
}

impl ProductForm {
    /// Validate the form into a backend product body.
    ///
    /// # Errors
    ///
    /// Returns the message to show when a field is missing or malformed.
    pub fn parse(&self) -> std::result::Result<ProductInput, &'static str> {
        let name = self.name.trim();
        let category = self.category.trim();
        if name.is_empty() || self.price.trim().is_empty() || category.is_empty() {
            return Err("All product fields are required");
        }

        let price = Price::parse(&self.price).map_err(|_| "Please enter a valid price")?;
        let stock = match self.stock.trim() {
            "" => 0,
            stock => stock
                .parse()
                .map_err(|_| "Stock must be a whole number")?,
        };
        let image = Some(self.image.trim())
            .filter(|image| !image.is_empty())
            .map(String::from);

        Ok(ProductInput {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            price,
            category: Some(CategoryId::new(category)),
            stock,
            image,
        })
    }
}

/// Category create form data.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

impl CategoryForm {
    /// # Errors
    ///
    /// Returns the message to show when the name is blank.
    pub fn parse(&self) -> std::result::Result<CategoryInput, &'static str> {
        if self.name.trim().is_empty() {
            return Err("Category name is required");
        }
        Ok(CategoryInput::named(&self.name))
    }
}

/// Values pre-filled into the product form.
#[derive(Debug, Clone, Default)]
pub struct ProductFormView {
    /// Set when editing an existing product.
    pub id: Option<String>,
    /// Where the form posts.
    pub action: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: String,
    pub image: String,
    pub categories: Vec<SelectOption>,
}

impl ProductFormView {
    /// Empty form for a new product, posting to `base`.
    #[must_use]
    pub fn blank(categories: &[Category], base: &str) -> Self {
        Self {
            action: base.to_string(),
            categories: category_options(categories, None),
            ..Self::default()
        }
    }

    /// Form filled with an existing product, posting to `base/<id>`.
    #[must_use]
    pub fn editing(product: &Product, categories: &[Category], base: &str) -> Self {
        let selected = product.category.as_ref().map(|c| c.id());
        Self {
            id: Some(product.id.to_string()),
            action: format!("{base}/{}", product.id),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.amount().to_string(),
            stock: product.stock.unwrap_or_default().to_string(),
            image: product.image.clone().unwrap_or_default(),
            categories: category_options(categories, selected),
        }
    }
}

fn category_options(categories: &[Category], selected: Option<&CategoryId>) -> Vec<SelectOption> {
    categories
        .iter()
        .map(|category| SelectOption {
            value: category.id.to_string(),
            label: category.name.clone(),
            selected: selected == Some(&category.id),
        })
        .collect()
}

/// A product row in dashboard tables.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub price: String,
    pub stock: String,
    pub category: String,
    pub out_of_stock: bool,
}

impl ProductRow {
    #[must_use]
    pub fn new(product: &Product, categories: &[Category]) -> Self {
        let category = product.category.as_ref().and_then(|c| {
            c.name().map(String::from).or_else(|| {
                categories
                    .iter()
                    .find(|category| &category.id == c.id())
                    .map(|category| category.name.clone())
            })
        });
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: product.price.display(),
            stock: product
                .stock
                .map_or_else(|| "-".to_string(), |stock| stock.to_string()),
            category: category.unwrap_or_else(|| "-".to_string()),
            out_of_stock: product.is_out_of_stock(),
        }
    }
}

/// A category row in dashboard tables.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Seller dashboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SellQuery {
    /// Product to load into the form.
    #[serde(default)]
    pub edit: Option<String>,
}

/// Stock summary shown above the product table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockStats {
    pub total: usize,
    pub in_stock: usize,
    pub out_of_stock: usize,
}

impl StockStats {
    #[must_use]
    pub fn of(products: &[Product]) -> Self {
        let out_of_stock = products.iter().filter(|p| p.is_out_of_stock()).count();
        Self {
            total: products.len(),
            in_stock: products.len() - out_of_stock,
            out_of_stock,
        }
    }
}

/// Seller dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "sell/dashboard.html")]
pub struct SellTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub is_seller: bool,
    pub stats: StockStats,
    pub products: Vec<ProductRow>,
    pub categories: Vec<CategoryRow>,
    pub form: ProductFormView,
}

/// Display the seller dashboard.
#[instrument(skip(state, signed_in))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Query(query): Query<SellQuery>,
    Query(mut flash): Query<Flash>,
) -> Result<SellTemplate> {
    let (products, categories) =
        tokio::join!(state.api().list_products(), state.api().list_categories());

    let products = match products {
        Ok(products) => products,
        Err(e) => {
            flash.error = Some(inline_message(e)?);
            Vec::new()
        }
    };
    let categories = match categories {
        Ok(categories) => categories,
        Err(e) => {
            let message = inline_message(e)?;
            flash.error.get_or_insert(message);
            Vec::new()
        }
    };

    let editing = query
        .edit
        .as_deref()
        .and_then(|id| products.iter().find(|p| p.id.as_str() == id));
    let form = editing.map_or_else(
        || ProductFormView::blank(&categories, PRODUCTS_PATH),
        |product| ProductFormView::editing(product, &categories, PRODUCTS_PATH),
    );

    Ok(SellTemplate {
        shell: Shell::load(&state, &signed_in.visitor).await?,
        flash,
        is_seller: signed_in.user.role.is_seller(),
        stats: StockStats::of(&products),
        products: products
            .iter()
            .map(|product| ProductRow::new(product, &categories))
            .collect(),
        categories: categories.iter().map(CategoryRow::from).collect(),
        form,
    })
}

/// List a new product.
#[instrument(skip(state, signed_in, form))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return Ok(redirect_error(SELL_PATH, message)),
    };

    match state
        .api()
        .create_product(&signed_in.credentials, &input)
        .await
    {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product listed");
            Ok(redirect_notice(SELL_PATH, "Product added"))
        }
        Err(e) => Ok(redirect_error(SELL_PATH, &inline_message(e)?)),
    }
}

/// Save changes to a product.
#[instrument(skip(state, signed_in, form))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return Ok(redirect_error(&format!("{SELL_PATH}?edit={id}"), message)),
    };

    match state
        .api()
        .update_product(&signed_in.credentials, &id, &input)
        .await
    {
        Ok(_) => Ok(redirect_notice(SELL_PATH, "Product updated")),
        Err(e) => Ok(redirect_error(SELL_PATH, &inline_message(e)?)),
    }
}

/// Delete a product.
#[instrument(skip(state, signed_in))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    match state
        .api()
        .delete_product(&signed_in.credentials, &id)
        .await
    {
        Ok(()) => Ok(redirect_notice(SELL_PATH, "Product deleted")),
        Err(e) => Ok(redirect_error(SELL_PATH, &inline_message(e)?)),
    }
}

/// Add a category; its slug is derived from the name.
#[instrument(skip(state, signed_in, form))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return Ok(redirect_error(SELL_PATH, message)),
    };

    match state
        .api()
        .create_category(&signed_in.credentials, &input)
        .await
    {
        Ok(_) => Ok(redirect_notice(SELL_PATH, "Category added")),
        Err(e) => Ok(redirect_error(SELL_PATH, &inline_message(e)?)),
    }
}

/// Rename a category.
#[instrument(skip(state, signed_in, form))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return Ok(redirect_error(SELL_PATH, message)),
    };

    match state
        .api()
        .update_category(&signed_in.credentials, &CategoryId::new(id), &input)
        .await
    {
        Ok(_) => Ok(redirect_notice(SELL_PATH, "Category updated")),
        Err(e) => Ok(redirect_error(SELL_PATH, &inline_message(e)?)),
    }
}

/// Delete a category.
#[instrument(skip(state, signed_in))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    match state
        .api()
        .delete_category(&signed_in.credentials, &CategoryId::new(id))
        .await
    {
        Ok(()) => Ok(redirect_notice(SELL_PATH, "Category deleted")),
        Err(e) => Ok(redirect_error(SELL_PATH, &inline_message(e)?)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(name: &str, price: &str, category: &str, stock: &str) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            price: price.to_string(),
            category: category.to_string(),
            stock: stock.to_string(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_product_form_requires_fields() {
        assert_eq!(
            form("", "10", "c1", "").parse().err(),
            Some("All product fields are required")
        );
        assert_eq!(
            form("Lamp", "10", " ", "").parse().err(),
            Some("All product fields are required")
        );
        assert_eq!(
            form("Lamp", "ten", "c1", "").parse().err(),
            Some("Please enter a valid price")
        );
        assert_eq!(
            form("Lamp", "10", "c1", "many").parse().err(),
            Some("Stock must be a whole number")
        );
    }

    #[test]
    fn test_product_form_parses() {
        let input = form(" Lamp ", "19.99", "c1", "").parse().unwrap();
        assert_eq!(input.name, "Lamp");
        assert_eq!(input.price, Price::parse("19.99").unwrap());
        assert_eq!(input.category, Some(CategoryId::new("c1")));
        assert_eq!(input.stock, 0);
        assert_eq!(input.image, None);
    }

    #[test]
    fn test_category_form_derives_slug() {
        let input = CategoryForm {
            name: "Home Garden".to_string(),
        }
        .parse()
        .unwrap();
        assert_eq!(input.slug, "home-garden");
        assert!(CategoryForm { name: "  ".to_string() }.parse().is_err());
    }

    #[test]
    fn test_stock_stats_and_rows() {
        let products: Vec<Product> = serde_json::from_value(json!([
            { "_id": "p1", "name": "Lamp", "price": 10, "stock": 0, "category": "c1" },
            { "_id": "p2", "name": "Desk", "price": 50, "stock": 3 },
        ]))
        .unwrap();
        let categories: Vec<Category> =
            serde_json::from_value(json!([{ "_id": "c1", "name": "Home" }])).unwrap();

        assert_eq!(
            StockStats::of(&products),
            StockStats {
                total: 2,
                in_stock: 1,
                out_of_stock: 1
            }
        );

        let row = ProductRow::new(&products[0], &categories);
        assert_eq!(row.category, "Home");
        assert!(row.out_of_stock);
        assert_eq!(ProductRow::new(&products[1], &categories).category, "-");

        let form = ProductFormView::editing(&products[0], &categories, "/sell/products");
        assert_eq!(form.id.as_deref(), Some("p1"));
        assert_eq!(form.action, "/sell/products/p1");
        assert!(form.categories[0].selected);
    }
}
