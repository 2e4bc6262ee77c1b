//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page (?welcome=1 after registration)
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (session database)
//!
//! # Catalog
//! GET  /products                - Product listing (?q=&category=)
//! GET  /products/{id}           - Product detail with reviews
//! POST /products/{id}/reviews   - Add a review
//! GET  /categories              - Categories (?selected=)
//!
//! # Cart (guests allowed)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add to cart, back to referring page
//! POST /cart/remove             - Remove a line
//! POST /cart/clear              - Empty the cart
//! GET  /cart/count              - Cart count badge (fragment)
//!
//! # Checkout and orders (requires auth)
//! GET  /checkout                - Shipping form
//! POST /checkout                - Place the order
//! GET  /orders                  - Order history (?status=)
//! GET  /orders/{id}             - Order detail with progress
//! POST /orders/{id}/cancel      - Cancel a non-terminal order
//!
//! # Auth (posts are rate limited)
//! GET  /auth/login              - Login page
//! POST /auth/login              - Login action
//! GET  /auth/register           - Register page
//! POST /auth/register           - Register action
//! POST /auth/logout             - Logout action
//!
//! # Account (requires auth)
//! GET  /profile                 - Profile
//! POST /profile                 - Update username and email
//! POST /profile/password        - Change password
//! POST /profile/become-seller   - Upgrade to a seller account
//! GET  /favorites               - Saved products (guests allowed)
//! POST /favorites/toggle        - Save or unsave, back to referring page
//! POST /favorites/remove        - Unsave from the favorites page
//!
//! # Seller dashboard (requires auth)
//! GET  /sell                           - Dashboard (?edit=)
//! POST /sell/products                  - Create product
//! POST /sell/products/{id}             - Update product
//! POST /sell/products/{id}/delete      - Delete product
//! POST /sell/categories                - Create category
//! POST /sell/categories/{id}           - Rename category
//! POST /sell/categories/{id}/delete    - Delete category
//!
//! # Admin dashboard (requires admin role)
//! GET  /admin                          - Dashboard (?tab=&status=&edit=)
//! POST /admin/orders/{id}/status       - Move order to a new status
//! POST /admin/orders/{id}/cancel       - Cancel order
//! POST /admin/products                 - Create product
//! POST /admin/products/{id}            - Update product
//! POST /admin/products/{id}/delete     - Delete product
//! POST /admin/categories               - Create category
//! POST /admin/categories/{id}          - Rename category
//! POST /admin/categories/{id}/delete   - Delete category
//!
//! # Preferences
//! POST /preferences/language    - Set interface language
//! POST /preferences/theme       - Toggle light/dark theme
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod favorites;
pub mod health;
pub mod home;
pub mod orders;
pub mod preferences;
pub mod products;
pub mod profile;
pub mod sell;
pub mod views;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/reviews", post(products::add_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show).post(profile::update))
        .route("/password", post(profile::change_password))
        .route("/become-seller", post(profile::become_seller))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/toggle", post(favorites::toggle))
        .route("/remove", post(favorites::remove))
}

/// Create the seller dashboard routes router.
pub fn sell_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sell::dashboard))
        .route("/products", post(sell::create_product))
        .route("/products/{id}", post(sell::update_product))
        .route("/products/{id}/delete", post(sell::delete_product))
        .route("/categories", post(sell::create_category))
        .route("/categories/{id}", post(sell::update_category))
        .route("/categories/{id}/delete", post(sell::delete_category))
}

/// Create the admin dashboard routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/orders/{id}/status", post(admin::update_order_status))
        .route("/orders/{id}/cancel", post(admin::cancel_order))
        .route("/products", post(admin::create_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/categories", post(admin::create_category))
        .route("/categories/{id}", post(admin::update_category))
        .route("/categories/{id}/delete", post(admin::delete_category))
}

/// Create the preference routes router.
pub fn preference_routes() -> Router<AppState> {
    Router::new()
        .route("/language", post(preferences::set_language))
        .route("/theme", post(preferences::toggle_theme))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Health checks
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Catalog
        .nest("/products", product_routes())
        .route("/categories", get(categories::index))
        // Cart and checkout
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place_order))
        .nest("/orders", order_routes())
        // Auth routes
        .nest("/auth", auth_routes())
        // Account
        .nest("/profile", profile_routes())
        .nest("/favorites", favorite_routes())
        // Dashboards
        .nest("/sell", sell_routes())
        .nest("/admin", admin_routes())
        .nest("/preferences", preference_routes())
}
