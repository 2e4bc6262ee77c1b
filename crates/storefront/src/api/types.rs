//! Wire types for the marketplace REST backend.
//!
//! The backend speaks camelCase JSON with Mongo-style `_id` keys. Every
//! entity here accepts both `_id` and `id`, and references to other entities
//! accept either a bare id or the embedded (populated) document.

use bazaar_core::{CategoryId, OrderId, OrderStatus, Price, ProductId, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Users
// =============================================================================

/// A marketplace account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name shown in the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

/// `POST /auth/login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /auth/login` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Optional profile details collected at registration.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// `POST /auth/register` body. The email doubles as the username.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
    #[serde(flatten)]
    pub meta: &'a RegisterMeta,
}

/// `PATCH /users/profile` body.
#[derive(Debug, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
}

/// `POST /users/change-password` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Free-form acknowledgement returned by a few mutation endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A product's category: a bare id or the populated category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(CategoryId),
    Embedded(Category),
}

impl CategoryRef {
    #[must_use]
    pub const fn id(&self) -> &CategoryId {
        match self {
            Self::Id(id) => id,
            Self::Embedded(category) => &category.id,
        }
    }

    /// Category name when the backend populated it.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Embedded(category) => Some(&category.name),
        }
    }
}

/// A product as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl Product {
    /// Whether the product belongs to `category`.
    #[must_use]
    pub fn in_category(&self, category: &CategoryId) -> bool {
        self.category.as_ref().is_some_and(|c| c.id() == category)
    }

    /// Whether `stock` is known to be zero.
    #[must_use]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock == Some(0)
    }

    /// Case-insensitive match of `needle` against name and description.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }

    /// The subset of fields carried in carts and favorites.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
        }
    }
}

/// Minimal product data embedded in cart lines, order lines and favorites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    #[serde(alias = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A product reference: a bare id or the populated product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(ProductId),
    Embedded(ProductSnapshot),
}

impl ProductRef {
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Embedded(product) => &product.id,
        }
    }

    #[must_use]
    pub const fn snapshot(&self) -> Option<&ProductSnapshot> {
        match self {
            Self::Id(_) => None,
            Self::Embedded(product) => Some(product),
        }
    }
}

/// `POST /products` and `PATCH /products/:id` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    pub stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// `POST /categories` body.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryInput {
    /// Category input whose slug is derived from the name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            slug: slugify(name),
            description: None,
        }
    }
}

/// Lower-case `name` and join its words with dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

// =============================================================================
// Cart
// =============================================================================

/// Raw cart line as sent by the backend or read from the guest cart.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCartItem {
    product_id: ProductRef,
    quantity: u32,
    #[serde(default)]
    product: Option<ProductSnapshot>,
    #[serde(default)]
    price: Option<Price>,
}

/// A validated cart line.
///
/// Guest carts persist only `productId` and `quantity`; server carts may
/// carry the populated product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCartItem", rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl TryFrom<RawCartItem> for CartItem {
    type Error = String;

    fn try_from(raw: RawCartItem) -> Result<Self, Self::Error> {
        if raw.quantity == 0 {
            return Err(format!(
                "cart line for product {} has zero quantity",
                raw.product_id.id()
            ));
        }
        let product_id = raw.product_id.id().clone();
        let product = match raw.product_id {
            ProductRef::Embedded(snapshot) => Some(snapshot),
            ProductRef::Id(_) => raw.product,
        };
        Ok(Self {
            product_id,
            quantity: raw.quantity,
            product,
            price: raw.price,
        })
    }
}

impl CartItem {
    /// A guest cart line without product data.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            product: None,
            price: None,
        }
    }

    /// Unit price from the embedded product, else from the line itself.
    #[must_use]
    pub fn unit_price(&self) -> Option<Price> {
        self.product.as_ref().map(|p| p.price).or(self.price)
    }
}

/// `GET /orders/cart` and cart mutation responses.
#[derive(Debug, Default, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// `POST /orders/cart/add` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// `POST /orders/cart/remove` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest<'a> {
    pub product_id: &'a ProductId,
}

// =============================================================================
// Orders
// =============================================================================

/// Delivery address captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
}

/// One line of a placed order, priced at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(rename = "productId")]
    pub product: ProductRef,
    pub quantity: u32,
    #[serde(default)]
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl OrderItem {
    /// Best available product name.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.product
            .snapshot()
            .map(|p| p.name.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "Product".to_string())
    }

    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total_price: Price,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One line of a checkout request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
}

/// `POST /orders/checkout` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub total_price: Price,
    pub shipping_address: ShippingAddress,
    pub notes: String,
}

impl CheckoutRequest {
    /// Build a request from priced lines, totalling `price × quantity`.
    #[must_use]
    pub fn new(items: Vec<CheckoutItem>, shipping_address: ShippingAddress, notes: String) -> Self {
        let total_price = items.iter().map(|item| item.price.times(item.quantity)).sum();
        Self {
            items,
            total_price,
            shipping_address,
            notes,
        }
    }
}

/// `PATCH /admin/orders/:id` body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

// =============================================================================
// List envelopes
// =============================================================================

/// A list payload: either a bare array or an object wrapping one.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped(WrappedList<T>),
}

#[derive(Deserialize)]
pub(crate) struct WrappedList<T> {
    #[serde(alias = "products", alias = "categories", alias = "orders", alias = "items")]
    data: Vec<T>,
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped(wrapped) => wrapped.data,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_accepts_mongo_id_and_string_price() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1",
            "name": "Lamp",
            "price": "19.90",
            "category": { "_id": "c1", "name": "Home", "slug": "home" }
        }))
        .unwrap();

        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.price.display(), "$19.90");
        assert!(product.in_category(&CategoryId::new("c1")));
        assert_eq!(product.category.unwrap().name(), Some("Home"));
    }

    #[test]
    fn test_product_search_is_case_insensitive() {
        let product: Product = serde_json::from_value(json!({
            "id": "p1", "name": "Desk Lamp", "description": "Warm LED light", "price": 5
        }))
        .unwrap();

        assert!(product.matches("lamp"));
        assert!(product.matches("LED"));
        assert!(product.matches("  "));
        assert!(!product.matches("chair"));
    }

    #[test]
    fn test_cart_item_with_embedded_product() {
        let item: CartItem = serde_json::from_value(json!({
            "productId": { "_id": "p1", "name": "Lamp", "price": 100 },
            "quantity": 2
        }))
        .unwrap();

        assert_eq!(item.product_id.as_str(), "p1");
        assert_eq!(item.unit_price(), Some(Price::from_units(100)));
    }

    #[test]
    fn test_cart_item_rejects_zero_quantity() {
        let result = serde_json::from_value::<CartItem>(json!({
            "productId": "p1",
            "quantity": 0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_guest_cart_line_serializes_minimally() {
        let json = serde_json::to_value(CartItem::new(ProductId::new("p1"), 3)).unwrap();
        assert_eq!(json, json!({ "productId": "p1", "quantity": 3 }));

        let back: CartItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, CartItem::new(ProductId::new("p1"), 3));
    }

    #[test]
    fn test_list_envelope_shapes() {
        let bare: ListEnvelope<Category> =
            serde_json::from_value(json!([{ "_id": "c1", "name": "Home" }])).unwrap();
        assert_eq!(bare.into_vec().len(), 1);

        let wrapped: ListEnvelope<Category> =
            serde_json::from_value(json!({ "categories": [{ "_id": "c1" }, { "_id": "c2" }] }))
                .unwrap();
        assert_eq!(wrapped.into_vec().len(), 2);

        let data: ListEnvelope<Category> =
            serde_json::from_value(json!({ "data": [] })).unwrap();
        assert!(data.into_vec().is_empty());

        assert!(serde_json::from_value::<ListEnvelope<Category>>(json!({ "ok": true })).is_err());
    }

    #[test]
    fn test_order_item_names() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "status": "shipped",
            "totalPrice": 250,
            "items": [
                { "productId": { "_id": "p1", "name": "Lamp" }, "quantity": 2, "price": 100 },
                { "productId": "p2", "quantity": 1, "price": 50, "name": "Rug" },
                { "productId": "p3", "quantity": 1 }
            ]
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.item_count(), 4);
        let names: Vec<_> = order.items.iter().map(OrderItem::display_name).collect();
        assert_eq!(names, ["Lamp", "Rug", "Product"]);
        assert_eq!(order.items[0].line_total(), Price::from_units(200));
    }

    #[test]
    fn test_checkout_request_totals_lines() {
        let request = CheckoutRequest::new(
            vec![
                CheckoutItem {
                    product_id: ProductId::new("p1"),
                    quantity: 2,
                    price: Price::from_units(100),
                },
                CheckoutItem {
                    product_id: ProductId::new("p2"),
                    quantity: 1,
                    price: Price::from_units(5),
                },
            ],
            ShippingAddress::default(),
            String::new(),
        );

        assert_eq!(request.total_price, Price::from_units(205));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["items"][0]["productId"], "p1");
        assert_eq!(json["shippingAddress"]["zipCode"], "");
    }

    #[test]
    fn test_register_request_flattens_meta() {
        let meta = RegisterMeta {
            first_name: Some("Ada".to_string()),
            ..RegisterMeta::default()
        };
        let json = serde_json::to_value(RegisterRequest {
            username: "ada@example.com",
            password: "pw",
            email: "ada@example.com",
            meta: &meta,
        })
        .unwrap();

        assert_eq!(
            json,
            json!({
                "username": "ada@example.com",
                "password": "pw",
                "email": "ada@example.com",
                "firstName": "Ada"
            })
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Home  Office Gear"), "home-office-gear");
        assert_eq!(CategoryInput::named(" Toys ").slug, "toys");
    }
}
