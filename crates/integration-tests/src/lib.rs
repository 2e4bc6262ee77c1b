//! Integration tests for the Bazaar storefront and API proxy.
//!
//! Everything runs in-process: [`FakeBackend`] stands in for the marketplace
//! REST backend, and the storefront and proxy routers are served on
//! ephemeral ports next to it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! The storefront's session store runs in memory and its database pool is
//! lazy, so no `PostgreSQL` is needed.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};

/// Password accepted for every fake account.
pub const PASSWORD: &str = "secret";

/// Buyer account on the fake backend.
pub const BUYER: &str = "ada";

/// Admin account on the fake backend.
pub const ADMIN: &str = "root";

/// Serve `router` on an ephemeral local port.
///
/// # Panics
///
/// Panics if the port cannot be bound.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server failed");
    });
    addr
}

// =============================================================================
// Fake marketplace backend
// =============================================================================

#[derive(Default)]
struct BackendData {
    carts: HashMap<String, Vec<(String, u32)>>,
    orders: Vec<Value>,
}

#[derive(Default)]
struct BackendInner {
    data: Mutex<BackendData>,
    reject_tokens: AtomicBool,
    next_order: AtomicU32,
}

/// In-process marketplace backend with two products, one category and the
/// accounts [`BUYER`] and [`ADMIN`].
#[derive(Clone)]
pub struct FakeBackend {
    addr: SocketAddr,
    inner: Arc<BackendInner>,
}

impl FakeBackend {
    /// Start the backend on an ephemeral port.
    pub async fn spawn() -> Self {
        let inner = Arc::new(BackendInner::default());
        let addr = serve(backend_router(inner.clone())).await;
        Self { addr, inner }
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the REST API (with trailing slash).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Make every authenticated endpoint answer 401, as if tokens expired.
    pub fn reject_tokens(&self, reject: bool) {
        self.inner.reject_tokens.store(reject, Ordering::SeqCst);
    }

    /// Orders placed so far, as stored by the backend.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.inner.data.lock().orders.clone()
    }

    /// Server-side cart lines of `user_id`.
    #[must_use]
    pub fn cart_of(&self, user_id: &str) -> Vec<(String, u32)> {
        self.inner
            .data
            .lock()
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

type Backend = Arc<BackendInner>;

fn backend_router(inner: Backend) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/products", get(products))
        .route("/products/{id}", get(product))
        .route("/categories", get(categories))
        .route("/orders/cart", get(cart))
        .route("/orders/cart/add", post(cart_add))
        .route("/orders/cart/remove", post(cart_remove))
        .route("/orders/cart/clear", post(cart_clear))
        .route("/orders/checkout", post(checkout))
        .route("/orders/my-orders", get(my_orders))
        .route("/orders/{id}", get(order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/admin/orders/{id}", patch(admin_update_order))
        .route("/users/profile", get(profile))
        .route("/echo", get(echo))
        .route("/moved", get(|| async { Redirect::temporary("/products") }))
        .with_state(inner)
}

fn catalog() -> Vec<Value> {
    let home = json!({ "_id": "c1", "name": "Home", "slug": "home" });
    vec![
        json!({
            "_id": "p1",
            "name": "Lamp",
            "description": "Warm light",
            "price": 100,
            "stock": 5,
            "category": home,
        }),
        json!({
            "_id": "p2",
            "name": "Desk",
            "description": "Oak desk",
            "price": 50,
            "stock": 0,
            "category": "c1",
        }),
    ]
}

fn find_product(id: &str) -> Option<Value> {
    catalog().into_iter().find(|p| p["_id"] == id)
}

fn account(username: &str) -> Option<Value> {
    match username {
        BUYER => Some(json!({ "_id": "u1", "username": BUYER, "email": "ada@example.com", "role": "buyer" })),
        ADMIN => Some(json!({ "_id": "u0", "username": ADMIN, "email": "root@example.com", "role": "admin" })),
        _ => None,
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Resolve the calling user id from the bearer token (`token-<username>`).
fn caller(backend: &Backend, headers: &HeaderMap) -> Result<String, Response> {
    if backend.reject_tokens.load(Ordering::SeqCst) {
        return Err(error(StatusCode::UNAUTHORIZED, "Token expired"));
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer token-"))
        .and_then(account)
        .and_then(|user| user["_id"].as_str().map(str::to_string))
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authorized"))
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn login(Json(body): Json<Credentials>) -> Response {
    match account(&body.username) {
        Some(user) if body.password == PASSWORD => Json(json!({
            "token": format!("token-{}", body.username),
            "user": user,
        }))
        .into_response(),
        _ => error(StatusCode::BAD_REQUEST, "Invalid username or password"),
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if account(body["username"].as_str().unwrap_or_default()).is_some() {
        return error(StatusCode::BAD_REQUEST, "User already exists");
    }
    (StatusCode::CREATED, Json(json!({ "message": "Registered" }))).into_response()
}

async fn products() -> Json<Value> {
    Json(json!({ "products": catalog() }))
}

async fn product(Path(id): Path<String>) -> Response {
    find_product(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, "Product not found"),
        |p| Json(p).into_response(),
    )
}

async fn categories() -> Json<Value> {
    Json(json!([{ "_id": "c1", "name": "Home", "slug": "home" }]))
}

fn cart_body(lines: &[(String, u32)]) -> Json<Value> {
    let items: Vec<Value> = lines
        .iter()
        .map(|(id, quantity)| {
            let product = find_product(id).unwrap_or_else(|| json!(id));
            json!({ "productId": product, "quantity": quantity })
        })
        .collect();
    Json(json!({ "items": items }))
}

async fn cart(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    match caller(&backend, &headers) {
        Ok(user) => cart_body(&backend.data.lock().carts.get(&user).cloned().unwrap_or_default())
            .into_response(),
        Err(response) => response,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartLine {
    product_id: String,
    #[serde(default)]
    quantity: u32,
}

async fn cart_add(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(line): Json<CartLine>,
) -> Response {
    let user = match caller(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match find_product(&line.product_id) {
        None => return error(StatusCode::NOT_FOUND, "Product not found"),
        Some(p) if p["stock"] == 0 => return error(StatusCode::BAD_REQUEST, "Out of stock"),
        Some(_) => {}
    }
    let mut data = backend.data.lock();
    let lines = data.carts.entry(user).or_default();
    match lines.iter_mut().find(|(id, _)| *id == line.product_id) {
        Some((_, quantity)) => *quantity += line.quantity,
        None => lines.push((line.product_id, line.quantity)),
    }
    cart_body(lines).into_response()
}

async fn cart_remove(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(line): Json<CartLine>,
) -> Response {
    let user = match caller(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let mut data = backend.data.lock();
    let lines = data.carts.entry(user).or_default();
    lines.retain(|(id, _)| *id != line.product_id);
    cart_body(lines).into_response()
}

async fn cart_clear(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    match caller(&backend, &headers) {
        Ok(user) => {
            backend.data.lock().carts.remove(&user);
            Json(json!({ "message": "Cart cleared" })).into_response()
        }
        Err(response) => response,
    }
}

async fn checkout(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = match caller(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let number = backend.next_order.fetch_add(1, Ordering::SeqCst) + 1;
    let order = json!({
        "_id": format!("o{number}"),
        "user": user,
        "items": body["items"],
        "totalPrice": body["totalPrice"],
        "shippingAddress": body["shippingAddress"],
        "notes": body["notes"],
        "status": "pending",
        "createdAt": "2026-10-17T09:30:00Z",
    });
    backend.data.lock().orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn my_orders(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    match caller(&backend, &headers) {
        Ok(user) => {
            let orders: Vec<Value> = backend
                .data
                .lock()
                .orders
                .iter()
                .filter(|o| o["user"] == user.as_str())
                .cloned()
                .collect();
            Json(orders).into_response()
        }
        Err(response) => response,
    }
}

async fn order(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = caller(&backend, &headers) {
        return response;
    }
    let found = backend
        .data
        .lock()
        .orders
        .iter()
        .find(|o| o["_id"] == id.as_str())
        .cloned();
    found.map_or_else(
        || error(StatusCode::NOT_FOUND, "Order not found"),
        |o| Json(o).into_response(),
    )
}

/// Set the status of a stored order. Returns whether the order exists.
fn set_status(backend: &Backend, id: &str, status: &str) -> bool {
    let mut data = backend.data.lock();
    match data.orders.iter_mut().find(|o| o["_id"] == id) {
        Some(order) => {
            order["status"] = json!(status);
            true
        }
        None => false,
    }
}

async fn cancel_order(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = match caller(&backend, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let owned = backend
        .data
        .lock()
        .orders
        .iter()
        .any(|o| o["_id"] == id.as_str() && o["user"] == user.as_str());
    if !owned {
        return error(StatusCode::NOT_FOUND, "Order not found");
    }
    set_status(&backend, &id, "cancelled");
    Json(json!({ "message": "Order cancelled" })).into_response()
}

async fn admin_update_order(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    match caller(&backend, &headers) {
        Ok(user) if user == "u0" => {}
        Ok(_) => return error(StatusCode::FORBIDDEN, "Admin only"),
        Err(response) => return response,
    }
    let Some(status) = body["status"].as_str() else {
        return error(StatusCode::BAD_REQUEST, "Missing status");
    };
    if set_status(&backend, &id, status) {
        Json(json!({ "message": "Order updated" })).into_response()
    } else {
        error(StatusCode::NOT_FOUND, "Order not found")
    }
}

async fn profile(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let token_user = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer token-"))
        .and_then(account);
    match (caller(&backend, &headers), token_user) {
        (Ok(_), Some(user)) => Json(user).into_response(),
        (Err(response), _) => response,
        (Ok(_), None) => error(StatusCode::UNAUTHORIZED, "Not authorized"),
    }
}

/// Reflect what the backend received, for proxy tests.
async fn echo(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let received = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "host": received("host"),
        "authorization": received("authorization"),
        "userId": received("x-user-id"),
        "query": query,
    }))
}

// =============================================================================
// Servers under test
// =============================================================================

/// Start a storefront wired to `backend`, returning its base URL.
///
/// # Panics
///
/// Panics if the storefront cannot be configured.
pub async fn spawn_storefront(backend: &FakeBackend) -> String {
    spawn_storefront_with_state(backend).await.0
}

/// Like [`spawn_storefront`], also returning the storefront's state.
///
/// # Panics
///
/// Panics if the storefront cannot be configured.
pub async fn spawn_storefront_with_state(
    backend: &FakeBackend,
) -> (String, bazaar_storefront::state::AppState) {
    use bazaar_storefront::config::{ApiConfig, StorefrontConfig};
    use bazaar_storefront::middleware::session_layer;
    use bazaar_storefront::state::AppState;
    use sqlx::postgres::PgPoolOptions;
    use tower_sessions::MemoryStore;

    let api = ApiConfig::with_base_url(&backend.base_url()).expect("Invalid backend URL");
    let mut config = StorefrontConfig::local(api);
    config.auto_delivery_delay = Duration::from_secs(3600);

    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://bazaar@127.0.0.1:9/bazaar")
        .expect("Invalid database URL");
    let state = AppState::new(config, pool).expect("Failed to build storefront state");
    let app = bazaar_storefront::app(
        state.clone(),
        session_layer(MemoryStore::default(), false),
    );

    (format!("http://{}", serve(app).await), state)
}

/// Start an API proxy forwarding to `target`, returning its base URL.
///
/// # Panics
///
/// Panics if the proxy's HTTP client cannot be built.
pub async fn spawn_proxy(target: Option<url::Url>) -> String {
    use bazaar_api_proxy::ProxyState;
    use bazaar_api_proxy::config::ProxyConfig;

    let state = ProxyState::new(ProxyConfig::with_target(target)).expect("Failed to build proxy");
    format!("http://{}", serve(bazaar_api_proxy::app(state)).await)
}

/// Browser-like client: keeps cookies and follows redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}
