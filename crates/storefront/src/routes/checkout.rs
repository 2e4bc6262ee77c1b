//! Checkout: turn the signed-in visitor's cart into an order.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::Price;
use serde::Deserialize;
use tracing::instrument;

use super::cart::{CartLineView, cart_total, load_cart};
use super::views::{Flash, Shell, redirect_error, redirect_notice};
use crate::api::ApiClient;
use crate::api::types::{CheckoutItem, CheckoutRequest, ShippingAddress};
use crate::error::{Result, add_breadcrumb, inline_message};
use crate::middleware::RequireAuth;
use crate::providers::cart::ResolvedLine;
use crate::state::AppState;

const CHECKOUT_PATH: &str = "/checkout";

/// Minimum number of digits in a phone number.
const MIN_PHONE_DIGITS: usize = 10;

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    #[serde(default)]
    pub notes: String,
}

impl CheckoutForm {
    fn shipping_address(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            zip_code: self.zip_code.trim().to_string(),
        }
    }
}

/// Check that every address field is filled and the phone has enough digits.
///
/// # Errors
///
/// Returns the message to show on the checkout form.
pub fn validate_shipping(address: &ShippingAddress) -> std::result::Result<(), &'static str> {
    let fields = [
        &address.full_name,
        &address.phone,
        &address.address,
        &address.city,
        &address.zip_code,
    ];
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err("All fields are required");
    }
    let digits = address.phone.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        return Err("Please enter a valid phone number");
    }
    Ok(())
}

/// Price every line, looking up products whose price is still unknown.
pub async fn checkout_items(api: &ApiClient, lines: &[ResolvedLine]) -> Vec<CheckoutItem> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let mut price = line.unit_price();
        if price == Price::ZERO {
            match api.product_snapshot(&line.item.product_id).await {
                Ok(product) => price = product.price,
                Err(e) => {
                    tracing::warn!(product_id = %line.item.product_id, error = %e, "Could not price cart line");
                }
            }
        }
        items.push(CheckoutItem {
            product_id: line.item.product_id.clone(),
            quantity: line.item.quantity,
            price,
        });
    }
    items
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub full_name: String,
}

/// Display the order summary and shipping form.
#[instrument(skip(state, signed_in))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Query(flash): Query<Flash>,
) -> Result<Response> {
    let cart = load_cart(&state, &signed_in.visitor).await?;
    if let Some(error) = cart.error() {
        return Ok(redirect_error("/cart", error).into_response());
    }
    if cart.cart().is_empty() {
        return Ok(redirect_error("/cart", "Your cart is empty").into_response());
    }

    let lines = cart.resolve_lines().await;
    Ok(CheckoutTemplate {
        shell: Shell::with_cart(&signed_in.visitor, &cart).await?,
        flash,
        total: cart_total(&lines).display(),
        lines: lines.iter().map(CartLineView::from).collect(),
        full_name: signed_in.user.username.clone(),
    }
    .into_response())
}

/// Place the order, clear the cart and show the new order.
#[instrument(skip(state, signed_in, form))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect> {
    let shipping_address = form.shipping_address();
    if let Err(message) = validate_shipping(&shipping_address) {
        return Ok(redirect_error(CHECKOUT_PATH, message));
    }

    let mut cart = load_cart(&state, &signed_in.visitor).await?;
    if cart.cart().is_empty() {
        return Ok(redirect_error("/cart", "Your cart is empty"));
    }

    let lines = cart.resolve_lines().await;
    let items = checkout_items(state.api(), &lines).await;
    let request = CheckoutRequest::new(items, shipping_address, form.notes.trim().to_string());

    let order = match state.api().checkout(&signed_in.credentials, &request).await {
        Ok(order) => order,
        Err(e) => return Ok(redirect_error(CHECKOUT_PATH, &inline_message(e)?)),
    };

    tracing::info!(order_id = %order.id, total = %order.total_price, "Order placed");
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));

    if let Err(e) = cart.clear_cart().await {
        tracing::warn!(error = %e, "Failed to clear cart after checkout");
    }

    Ok(redirect_notice(
        &format!("/orders/{}", order.id),
        "Order placed successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(phone: &str) -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            phone: phone.to_string(),
            address: "1 Analytical St".to_string(),
            city: "London".to_string(),
            zip_code: "N1".to_string(),
        }
    }

    #[test]
    fn test_validate_shipping() {
        assert_eq!(validate_shipping(&address("+1 (555) 010-9999")), Ok(()));
        assert_eq!(
            validate_shipping(&address("555-0101")),
            Err("Please enter a valid phone number")
        );

        let mut missing = address("5550109999");
        missing.city = "  ".to_string();
        assert_eq!(validate_shipping(&missing), Err("All fields are required"));
    }
}
