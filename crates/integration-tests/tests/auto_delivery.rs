//! Auto-delivery timers across admin and customer actions.

#![allow(clippy::unwrap_used)]

use bazaar_core::OrderId;
use bazaar_integration_tests::{
    ADMIN, BUYER, FakeBackend, PASSWORD, browser, spawn_storefront_with_state,
};
use reqwest::StatusCode;

async fn sign_in(base: &str, username: &str) -> reqwest::Client {
    let client = browser();
    let resp = client
        .post(format!("{base}/auth/login"))
        .form(&[("username", username), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    client
}

async fn place_order(base: &str, buyer: &reqwest::Client) {
    buyer
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", "p1"), ("quantity", "1")])
        .send()
        .await
        .unwrap();
    let resp = buyer
        .post(format!("{base}/checkout"))
        .form(&[
            ("full_name", "Ada Lovelace"),
            ("phone", "+44 20 7946 0958"),
            ("address", "1 Analytical St"),
            ("city", "London"),
            ("zip_code", "N1 9GU"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/orders/o1");
}

#[tokio::test]
async fn test_shipped_order_timer_survives_partial_admin_listing_and_customer_cancel_stops_it() {
    let backend = FakeBackend::spawn().await;
    let (base, state) = spawn_storefront_with_state(&backend).await;
    let order_id = OrderId::new("o1");

    let buyer = sign_in(&base, BUYER).await;
    place_order(&base, &buyer).await;

    // The fake backend has no admin order listing, so the dashboard falls
    // back to the admin's own (empty) order list after shipping.
    let admin = sign_in(&base, ADMIN).await;
    let resp = admin
        .post(format!("{base}/admin/orders/o1/status"))
        .form(&[("status", "shipped"), ("current", "pending")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/admin");
    assert_eq!(backend.orders()[0]["status"], "shipped");
    assert!(state.auto_delivery().is_scheduled(&order_id));

    let resp = admin.get(format!("{base}/admin")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(state.auto_delivery().is_scheduled(&order_id));

    let resp = buyer
        .post(format!("{base}/orders/o1/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.url().path(), "/orders/o1");
    assert!(resp.url().query().unwrap_or_default().contains("notice="));
    assert_eq!(backend.orders()[0]["status"], "cancelled");
    assert!(!state.auto_delivery().is_scheduled(&order_id));
}
