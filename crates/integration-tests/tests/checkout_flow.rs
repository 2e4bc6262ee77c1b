//! Cart-to-order flow against the fake marketplace backend.
//!
//! Exercised twice: directly through the providers, and through the
//! storefront's HTML routes with a cookie-keeping client.

#![allow(clippy::unwrap_used)]

use bazaar_core::{Price, ProductId};
use bazaar_integration_tests::{BUYER, FakeBackend, PASSWORD, browser, spawn_storefront};
use bazaar_storefront::api::ApiClient;
use bazaar_storefront::api::types::{CheckoutRequest, ShippingAddress};
use bazaar_storefront::config::ApiConfig;
use bazaar_storefront::providers::{Auth, Cart, InMemoryStore, keys};
use bazaar_storefront::routes::checkout::checkout_items;
use reqwest::StatusCode;

fn api_for(backend: &FakeBackend) -> ApiClient {
    ApiClient::new(&ApiConfig::with_base_url(&backend.base_url()).unwrap()).unwrap()
}

fn shipping() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ada Lovelace".to_string(),
        phone: "+44 20 7946 0958".to_string(),
        address: "1 Analytical St".to_string(),
        city: "London".to_string(),
        zip_code: "N1 9GU".to_string(),
    }
}

// ============================================================================
// Providers
// ============================================================================

#[tokio::test]
async fn test_signed_in_checkout_totals_cart_lines() {
    let backend = FakeBackend::spawn().await;
    let api = api_for(&backend);
    let store = InMemoryStore::new();

    let mut auth = Auth::rehydrate(store.clone()).await.unwrap();
    auth.login(&api, BUYER, PASSWORD).await.unwrap();
    assert!(store.contains_key(keys::TOKEN));
    let credentials = auth.credentials().cloned().unwrap();

    let mut cart = Cart::load(store.clone(), api.clone(), Some(credentials.clone()))
        .await
        .unwrap();
    assert!(cart.cart().is_empty());
    cart.add_to_cart(&ProductId::new("p1"), 2).await.unwrap();
    assert_eq!(cart.cart_count(), 1);
    assert_eq!(backend.cart_of("u1"), vec![("p1".to_string(), 2)]);

    let lines = cart.resolve_lines().await;
    let items = checkout_items(&api, &lines).await;
    let request = CheckoutRequest::new(items, shipping(), String::new());
    let order = api.checkout(&credentials, &request).await.unwrap();

    assert!(order.total_price >= Price::from_units(200));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items.first().unwrap().quantity, 2);
    assert_eq!(order.items.first().unwrap().product.id().as_str(), "p1");

    // Signed-in carts live on the backend only
    assert!(!store.contains_key(keys::GUEST_CART));
}

#[tokio::test]
async fn test_guest_cart_accumulates_in_store() {
    let backend = FakeBackend::spawn().await;
    let store = InMemoryStore::new();

    let mut cart = Cart::load(store.clone(), api_for(&backend), None)
        .await
        .unwrap();
    cart.add_to_cart(&ProductId::new("p1"), 1).await.unwrap();
    cart.add_to_cart(&ProductId::new("p1"), 2).await.unwrap();

    assert_eq!(cart.cart_count(), 1);
    assert_eq!(cart.total_quantity(), 3);
    assert!(store.contains_key(keys::GUEST_CART));

    cart.clear_cart().await.unwrap();
    assert!(!store.contains_key(keys::GUEST_CART));
}

#[tokio::test]
async fn test_login_with_wrong_password_keeps_guest() {
    let backend = FakeBackend::spawn().await;
    let store = InMemoryStore::new();

    let mut auth = Auth::rehydrate(store.clone()).await.unwrap();
    let err = auth
        .login(&api_for(&backend), BUYER, "wrong")
        .await
        .err()
        .unwrap();

    assert_eq!(err.user_message(), "Invalid username or password");
    assert!(!auth.is_authenticated());
    assert!(!store.contains_key(keys::TOKEN));
}

// ============================================================================
// Storefront routes
// ============================================================================

#[tokio::test]
async fn test_storefront_checkout_places_order_and_clears_cart() {
    let backend = FakeBackend::spawn().await;
    let base = spawn_storefront(&backend).await;
    let client = browser();

    let resp = client
        .post(format!("{base}/auth/login"))
        .form(&[("username", BUYER), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/");

    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", "p1"), ("quantity", "2")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/cart");
    assert_eq!(backend.cart_of("u1"), vec![("p1".to_string(), 2)]);

    let resp = client.get(format!("{base}/checkout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Lamp"));
    assert!(body.contains("$200.00"));

    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[
            ("full_name", "Ada Lovelace"),
            ("phone", "+44 20 7946 0958"),
            ("address", "1 Analytical St"),
            ("city", "London"),
            ("zip_code", "N1 9GU"),
            ("notes", "Leave at the door"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/orders/o1");
    assert!(resp.text().await.unwrap().contains("Order placed successfully"));

    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    let order = orders.first().unwrap();
    assert!(order["totalPrice"].as_f64().unwrap() >= 200.0);
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["shippingAddress"]["city"], "London");
    assert!(backend.cart_of("u1").is_empty());
}

#[tokio::test]
async fn test_storefront_checkout_rejects_short_phone() {
    let backend = FakeBackend::spawn().await;
    let base = spawn_storefront(&backend).await;
    let client = browser();

    client
        .post(format!("{base}/auth/login"))
        .form(&[("username", BUYER), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", "p1")])
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[
            ("full_name", "Ada Lovelace"),
            ("phone", "555-0101"),
            ("address", "1 Analytical St"),
            ("city", "London"),
            ("zip_code", "N1 9GU"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/checkout");
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("Please enter a valid phone number")
    );
    assert!(backend.orders().is_empty());
}

#[tokio::test]
async fn test_storefront_shows_backend_errors_inline() {
    let backend = FakeBackend::spawn().await;
    let base = spawn_storefront(&backend).await;
    let client = browser();

    client
        .post(format!("{base}/auth/login"))
        .form(&[("username", BUYER), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();

    // p2 has no stock
    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", "p2")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/cart");
    assert!(resp.text().await.unwrap().contains("Out of stock"));
    assert!(backend.cart_of("u1").is_empty());
}

#[tokio::test]
async fn test_storefront_login_failure_returns_to_form() {
    let backend = FakeBackend::spawn().await;
    let base = spawn_storefront(&backend).await;

    let resp = browser()
        .post(format!("{base}/auth/login"))
        .form(&[("username", BUYER), ("password", "wrong")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/auth/login");
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("Invalid username or password")
    );
}
