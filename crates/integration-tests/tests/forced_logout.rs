//! A backend 401 signs the visitor out of the storefront.

#![allow(clippy::unwrap_used)]

use bazaar_integration_tests::{BUYER, FakeBackend, PASSWORD, browser, spawn_storefront};
use bazaar_storefront::api::{ApiClient, ApiError, Credentials};
use bazaar_storefront::config::ApiConfig;
use bazaar_storefront::providers::{Cart, CartError, InMemoryStore};
use reqwest::StatusCode;

async fn signed_in_client(base: &str) -> reqwest::Client {
    let client = browser();
    client
        .post(format!("{base}/auth/login"))
        .form(&[("username", BUYER), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    client
}

#[tokio::test]
async fn test_expired_token_forces_logout() {
    let backend = FakeBackend::spawn().await;
    let base = spawn_storefront(&backend).await;
    let client = browser();

    client
        .post(format!("{base}/auth/login"))
        .form(&[("username", BUYER), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();

    let resp = client.get(format!("{base}/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/orders");

    backend.reject_tokens(true);
    let resp = client.get(format!("{base}/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/auth/login");
    assert!(resp.url().query().unwrap_or_default().contains("error="));

    // The session no longer carries a token, even once the backend recovers
    backend.reject_tokens(false);
    let resp = client.get(format!("{base}/profile")).send().await.unwrap();
    assert_eq!(resp.url().path(), "/auth/login");
}

#[tokio::test]
async fn test_guest_pages_ignore_backend_auth_state() {
    let backend = FakeBackend::spawn().await;
    let base = spawn_storefront(&backend).await;
    backend.reject_tokens(true);

    let resp = browser().get(format!("{base}/products")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/products");
    assert!(resp.text().await.unwrap().contains("Lamp"));
}

#[tokio::test]
async fn test_rejected_token_on_cart_pages_forces_logout() {
    let backend = FakeBackend::spawn().await;
    let base = spawn_storefront(&backend).await;

    for page in ["/cart", "/checkout", "/products"] {
        let client = signed_in_client(&base).await;
        backend.reject_tokens(true);

        let resp = client.get(format!("{base}{page}")).send().await.unwrap();
        assert_eq!(resp.url().path(), "/auth/login", "{page}");
        assert!(resp.url().query().unwrap_or_default().contains("error="));

        backend.reject_tokens(false);
        let resp = client.get(format!("{base}/profile")).send().await.unwrap();
        assert_eq!(resp.url().path(), "/auth/login", "{page}");
    }
}

#[tokio::test]
async fn test_cart_load_returns_rejected_token() {
    let backend = FakeBackend::spawn().await;
    let api = ApiClient::new(&ApiConfig::with_base_url(&backend.base_url()).unwrap()).unwrap();
    backend.reject_tokens(true);

    let result = Cart::load(
        InMemoryStore::new(),
        api,
        Some(Credentials::new("token-ada", None)),
    )
    .await;
    assert!(matches!(
        result,
        Err(CartError::Api(ApiError::Unauthorized))
    ));
}
