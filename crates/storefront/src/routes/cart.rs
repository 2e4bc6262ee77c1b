//! Cart route handlers.
//!
//! Mutations are plain form posts that redirect back to the page they came
//! from. Guests and signed-in visitors share these handlers; the cart
//! provider picks the backing store.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use bazaar_core::{Price, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::views::{Flash, Shell, back_to, redirect_error, redirect_notice};
use crate::error::{Result, add_breadcrumb, inline_cart_message};
use crate::middleware::Visitor;
use crate::providers::Cart;
use crate::providers::cart::ResolvedLine;
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&ResolvedLine> for CartLineView {
    fn from(line: &ResolvedLine) -> Self {
        Self {
            product_id: line.item.product_id.to_string(),
            name: line.name().to_string(),
            image: line.product.as_ref().and_then(|p| p.image.clone()),
            quantity: line.item.quantity,
            unit_price: line.unit_price().display(),
            line_total: line.line_total().display(),
        }
    }
}

/// Sum of line totals.
#[must_use]
pub fn cart_total(lines: &[ResolvedLine]) -> Price {
    lines.iter().map(ResolvedLine::line_total).sum()
}

/// Load the visitor's cart in the mode matching their auth state.
///
/// # Errors
///
/// Returns a 401 from the backend cart so the visitor is signed out.
pub async fn load_cart(state: &AppState, visitor: &Visitor) -> Result<Cart<Session>> {
    let cart = Cart::load(
        visitor.session.clone(),
        state.api().clone(),
        visitor.credentials().cloned(),
    )
    .await?;
    Ok(cart)
}

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub total: String,
    pub is_guest: bool,
}

/// Cart count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, visitor))]
pub async fn show(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(mut flash): Query<Flash>,
) -> Result<CartShowTemplate> {
    let cart = load_cart(&state, &visitor).await?;
    if flash.error.is_none() {
        flash.error = cart.error().map(String::from);
    }

    let lines = cart.resolve_lines().await;

    Ok(CartShowTemplate {
        shell: Shell::with_cart(&visitor, &cart).await?,
        flash,
        item_count: cart.total_quantity(),
        total: cart_total(&lines).display(),
        lines: lines.iter().map(CartLineView::from).collect(),
        is_guest: cart.is_guest(),
    })
}

/// Add a product to the cart and go back.
#[instrument(skip(state, visitor, headers))]
pub async fn add(
    State(state): State<AppState>,
    visitor: Visitor,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let back = back_to(&headers, CART_PATH);
    let product_id = ProductId::new(form.product_id);
    let mut cart = load_cart(&state, &visitor).await?;

    match cart.add_to_cart(&product_id, form.quantity).await {
        Ok(_) => {
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
            Ok(redirect_notice(&back, "Added to cart"))
        }
        Err(e) => Ok(redirect_error(&back, &inline_cart_message(e)?)),
    }
}

/// Remove a product's line from the cart.
#[instrument(skip(state, visitor))]
pub async fn remove(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    let product_id = ProductId::new(form.product_id);
    let mut cart = load_cart(&state, &visitor).await?;

    match cart.remove_from_cart(&product_id).await {
        Ok(_) => Ok(Redirect::to(CART_PATH)),
        Err(e) => Ok(redirect_error(CART_PATH, &inline_cart_message(e)?)),
    }
}

/// Empty the cart.
#[instrument(skip(state, visitor))]
pub async fn clear(State(state): State<AppState>, visitor: Visitor) -> Result<Redirect> {
    let mut cart = load_cart(&state, &visitor).await?;

    match cart.clear_cart().await {
        Ok(()) => Ok(redirect_notice(CART_PATH, "Cart cleared")),
        Err(e) => Ok(redirect_error(CART_PATH, &inline_cart_message(e)?)),
    }
}

/// Cart count badge (number of distinct lines).
#[instrument(skip(state, visitor))]
pub async fn count(State(state): State<AppState>, visitor: Visitor) -> Result<CartCountTemplate> {
    let cart = load_cart(&state, &visitor).await?;
    Ok(CartCountTemplate {
        count: cart.cart_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{CartItem, ProductSnapshot};

    fn line(price: u32, quantity: u32, with_product: bool) -> ResolvedLine {
        let id = ProductId::new(format!("p{price}"));
        ResolvedLine {
            item: CartItem::new(id.clone(), quantity),
            product: with_product.then(|| ProductSnapshot {
                id,
                name: "Lamp".to_string(),
                price: Price::from_units(price),
                image: None,
            }),
        }
    }

    #[test]
    fn test_cart_total_sums_price_times_quantity() {
        let lines = [line(100, 2, true), line(5, 3, true)];
        assert_eq!(cart_total(&lines), Price::from_units(215));
    }

    #[test]
    fn test_unresolved_lines_count_as_zero() {
        let lines = [line(100, 1, true), line(7, 4, false)];
        assert_eq!(cart_total(&lines), Price::from_units(100));

        let view = CartLineView::from(&lines[1]);
        assert_eq!(view.name, "Product");
        assert_eq!(view.line_total, "$0.00");
    }
}
