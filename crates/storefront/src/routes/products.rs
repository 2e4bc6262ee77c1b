//! Product route handlers: listing with search, details and reviews.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use bazaar_core::{CategoryId, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::views::{
    Flash, ProductCard, SelectOption, Shell, format_date, redirect_error, redirect_notice,
};
use crate::api::ApiError;
use crate::api::types::Product;
use crate::error::{Result, inline_message};
use crate::middleware::Visitor;
use crate::providers::reviews::{RATING_RANGE, average};
use crate::providers::{Favorites, Review, ReviewError, Reviews};
use crate::state::AppState;

/// Message shown when the backend sends something other than a product list.
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected response from server";

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Keep products matching the search text and category filter.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    search: &str,
    category: Option<&CategoryId>,
) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|product| product.matches(search))
        .filter(|product| category.is_none_or(|c| product.in_category(c)))
        .collect()
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub search: String,
    pub categories: Vec<SelectOption>,
    pub products: Vec<ProductCard>,
    pub total: usize,
}

/// Display the product listing.
#[instrument(skip(state, visitor))]
pub async fn index(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<ProductsQuery>,
    Query(mut flash): Query<Flash>,
) -> Result<ProductsIndexTemplate> {
    let search = query.q.unwrap_or_default();
    let selected = query
        .category
        .filter(|c| !c.is_empty())
        .map(CategoryId::new);

    let products = match state.api().list_products().await {
        Ok(products) => products,
        Err(ApiError::UnexpectedShape(shape)) => {
            tracing::warn!(shape, "Product list had an unexpected shape");
            flash.error = Some(UNEXPECTED_RESPONSE_MESSAGE.to_string());
            Vec::new()
        }
        Err(e) => {
            flash.error = Some(inline_message(e)?);
            Vec::new()
        }
    };

    let categories = state.api().list_categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load category filter");
        Vec::new()
    });

    let favorites = Favorites::load(visitor.session.clone(), visitor.user_id()).await?;
    let products: Vec<ProductCard> = filter_products(&products, &search, selected.as_ref())
        .into_iter()
        .map(|product| ProductCard::new(product, &favorites))
        .collect();

    Ok(ProductsIndexTemplate {
        shell: Shell::load(&state, &visitor).await?,
        flash,
        search,
        categories: categories
            .iter()
            .map(|c| SelectOption {
                value: c.id.to_string(),
                label: c.name.clone(),
                selected: selected.as_ref() == Some(&c.id),
            })
            .collect(),
        total: products.len(),
        products,
    })
}

// =============================================================================
// Product Details
// =============================================================================

/// One review as displayed.
#[derive(Debug, Clone)]
pub struct ReviewView {
    pub author: String,
    pub text: String,
    pub rating: u8,
    pub stars: String,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author: review.author.clone(),
            text: review.text.clone(),
            rating: review.rating,
            stars: stars(review.rating),
            date: format_date(Some(review.created_at)),
        }
    }
}

/// Five-character star bar for a 1-5 rating.
fn stars(rating: u8) -> String {
    RATING_RANGE
        .map(|i| if i <= rating { '★' } else { '☆' })
        .collect()
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub product: ProductCard,
    pub description: String,
    pub stock_label: Option<String>,
    pub reviews: Vec<ReviewView>,
    pub average_rating: Option<String>,
    pub ratings: Vec<u8>,
    pub author: String,
}

/// Display a product with its reviews.
#[instrument(skip(state, visitor))]
pub async fn show(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<String>,
    Query(flash): Query<Flash>,
) -> Result<ProductShowTemplate> {
    let id = ProductId::new(id);
    let product = state.api().get_product(&id).await?;

    let favorites = Favorites::load(visitor.session.clone(), visitor.user_id()).await?;
    let reviews = Reviews::new(visitor.session.clone()).reviews(&id).await?;

    let mut card = ProductCard::new(&product, &favorites);
    if card.category.is_none()
        && let Some(category) = &product.category
    {
        card.category = state
            .api()
            .get_category(category.id())
            .await
            .ok()
            .map(|c| c.name);
    }

    Ok(ProductShowTemplate {
        shell: Shell::load(&state, &visitor).await?,
        flash,
        description: product.description.clone(),
        stock_label: product.stock.map(|stock| match stock {
            0 => "Out of stock".to_string(),
            n => format!("{n} in stock"),
        }),
        product: card,
        average_rating: average(&reviews).map(|avg| format!("{avg:.1}")),
        reviews: reviews.iter().map(ReviewView::from).collect(),
        ratings: RATING_RANGE.rev().collect(),
        author: visitor
            .user()
            .map(|user| user.display_name().to_string())
            .unwrap_or_default(),
    })
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub author: String,
    pub text: String,
    #[serde(default = "default_rating")]
    pub rating: u8,
}

const fn default_rating() -> u8 {
    *RATING_RANGE.end()
}

/// Add a review to a product.
#[instrument(skip(visitor, form))]
pub async fn add_review(
    visitor: Visitor,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let path = format!("/products/{id}");

    let author = if form.author.trim().is_empty() {
        visitor
            .user()
            .map(|user| user.display_name().to_string())
            .unwrap_or_default()
    } else {
        form.author
    };

    match Reviews::new(visitor.session.clone())
        .add_review(&id, &author, &form.text, form.rating)
        .await
    {
        Ok(_) => Ok(redirect_notice(&path, "Thanks for your review!")),
        Err(ReviewError::EmptyText) => Ok(redirect_error(&path, "Please write a comment")),
        Err(ReviewError::Store(e)) => Err(e.into()),
    }
}
