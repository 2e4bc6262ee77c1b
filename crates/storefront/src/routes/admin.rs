//! Admin dashboard: marketplace stats, order moderation, products and
//! categories.
//!
//! Loading the dashboard reconciles the auto-delivery timers with the order
//! list it fetched, and every status change made here schedules or cancels
//! the order's timer. Only the full admin listing may cancel timers.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Redirect,
};
use bazaar_core::{CategoryId, OrderId, OrderStatus, Price, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::orders::{OrderRow, filter_orders, parse_status_filter, status_tabs};
use super::sell::{CategoryForm, CategoryRow, ProductForm, ProductFormView, ProductRow};
use super::views::{Flash, SelectOption, Shell, back_to, redirect_error, redirect_notice};
use crate::api::types::Order;
use crate::api::{ApiError, Credentials};
use crate::error::{Result, inline_message};
use crate::middleware::RequireAdmin;
use crate::services::auto_delivery::SyncReport;
use crate::services::{AdminStatusUpdater, AutoDeliveryScheduler, OrderStatusUpdater};
use crate::state::AppState;

const ORDERS_TAB: &str = "/admin?tab=orders";
const PRODUCTS_TAB: &str = "/admin?tab=products";
const CATEGORIES_TAB: &str = "/admin?tab=categories";
const PRODUCTS_PATH: &str = "/admin/products";

/// Number of orders in the overview's recent list.
const RECENT_ORDERS: usize = 5;

// =============================================================================
// Tabs and stats
// =============================================================================

/// Dashboard section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdminTab {
    #[default]
    Overview,
    Orders,
    Products,
    Categories,
}

impl AdminTab {
    pub const ALL: [Self; 4] = [Self::Overview, Self::Orders, Self::Products, Self::Categories];

    /// Tab named in the query string; unknown names show the overview.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|tab| Some(tab.as_str()) == value)
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Orders => "orders",
            Self::Products => "products",
            Self::Categories => "categories",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Orders => "Orders",
            Self::Products => "Products",
            Self::Categories => "Categories",
        }
    }
}

/// Headline numbers of the overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminStats {
    pub orders: usize,
    pub revenue: String,
    pub products: usize,
    pub categories: usize,
}

impl AdminStats {
    /// Revenue is the total of every order, whatever its status.
    #[must_use]
    pub fn new(orders: &[Order], products: usize, categories: usize) -> Self {
        let revenue: Price = orders.iter().map(|order| order.total_price).sum();
        Self {
            orders: orders.len(),
            revenue: revenue.display(),
            products,
            categories,
        }
    }
}

/// The newest `limit` orders. Orders without a date sort last.
#[must_use]
pub fn recent_orders(orders: &[Order], limit: usize) -> Vec<&Order> {
    let mut recent: Vec<&Order> = orders.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(limit);
    recent
}

/// Check an admin status change.
///
/// # Errors
///
/// Returns the message to show when the move is not allowed.
pub fn validate_transition(
    current: OrderStatus,
    target: OrderStatus,
) -> std::result::Result<(), &'static str> {
    if current.is_terminal() {
        return Err("This order can no longer be changed");
    }
    if !current.can_transition_to(target) {
        return Err("Invalid status change");
    }
    Ok(())
}

/// Orders fetched for the dashboard.
#[derive(Debug)]
enum OrderListing {
    /// Every order in the marketplace.
    All(Vec<Order>),
    /// Only the admin's own orders, after the admin listing failed.
    Own(Vec<Order>),
}

impl OrderListing {
    /// Bring the auto-delivery timers in line with the listing. A partial
    /// listing adds timers but never cancels one.
    fn reconcile_deliveries<U: OrderStatusUpdater>(
        &self,
        scheduler: &AutoDeliveryScheduler,
        updater: &U,
    ) -> SyncReport {
        match self {
            Self::All(orders) => scheduler.sync(orders, updater),
            Self::Own(orders) => SyncReport {
                scheduled: scheduler.schedule_shipped(orders, updater),
                cancelled: 0,
            },
        }
    }

    fn into_orders(self) -> Vec<Order> {
        match self {
            Self::All(orders) | Self::Own(orders) => orders,
        }
    }
}

/// Every order in the marketplace, or the admin's own orders when the admin
/// listing is unavailable.
async fn load_orders(
    state: &AppState,
    credentials: &Credentials,
) -> std::result::Result<OrderListing, ApiError> {
    match state.api().admin_orders(credentials).await {
        Ok(orders) => Ok(OrderListing::All(orders)),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
        Err(e) => {
            tracing::warn!(error = %e, "Admin order list failed, falling back to own orders");
            state.api().my_orders(credentials).await.map(OrderListing::Own)
        }
    }
}

fn updater(state: &AppState, credentials: &Credentials) -> AdminStatusUpdater {
    AdminStatusUpdater::new(state.api().clone(), credentials.clone())
}

// =============================================================================
// Dashboard
// =============================================================================

/// Dashboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub edit: Option<String>,
}

/// A dashboard tab link.
#[derive(Debug, Clone)]
pub struct TabLink {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct AdminTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub tab: &'static str,
    pub tabs: Vec<TabLink>,
    pub stats: AdminStats,
    pub recent: Vec<OrderRow>,
    pub status_tabs: Vec<SelectOption>,
    pub orders: Vec<OrderRow>,
    pub products: Vec<ProductRow>,
    pub categories: Vec<CategoryRow>,
    pub form: ProductFormView,
    pub pending_deliveries: usize,
}

/// Display the admin dashboard.
#[instrument(skip(state, signed_in))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Query(query): Query<AdminQuery>,
    Query(mut flash): Query<Flash>,
) -> Result<AdminTemplate> {
    let tab = AdminTab::from_query(query.tab.as_deref());
    let filter = parse_status_filter(query.status.as_deref());
    let credentials = &signed_in.credentials;

    let (orders, products, categories) = tokio::join!(
        load_orders(&state, credentials),
        state.api().list_products(),
        state.api().list_categories(),
    );

    let orders = match orders {
        Ok(listing) => {
            listing.reconcile_deliveries(state.auto_delivery(), &updater(&state, credentials));
            listing.into_orders()
        }
        Err(e) => {
            flash.error = Some(inline_message(e)?);
            Vec::new()
        }
    };
    let products = match products {
        Ok(products) => products,
        Err(e) => {
            let message = inline_message(e)?;
            flash.error.get_or_insert(message);
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

    let form = query
        .edit
        .as_deref()
        .and_then(|id| products.iter().find(|p| p.id.as_str() == id))
        .map_or_else(
            || ProductFormView::blank(&categories, PRODUCTS_PATH),
            |product| ProductFormView::editing(product, &categories, PRODUCTS_PATH),
        );

    Ok(AdminTemplate {
        shell: Shell::load(&state, &signed_in.visitor).await?,
        flash,
        tab: tab.as_str(),
        tabs: AdminTab::ALL
            .into_iter()
            .map(|t| TabLink {
                value: t.as_str(),
                label: t.label(),
                selected: t == tab,
            })
            .collect(),
        stats: AdminStats::new(&orders, products.len(), categories.len()),
        recent: recent_orders(&orders, RECENT_ORDERS)
            .into_iter()
            .map(OrderRow::from)
            .collect(),
        status_tabs: status_tabs(filter),
        orders: filter_orders(&orders, filter)
            .into_iter()
            .map(OrderRow::from)
            .collect(),
        products: products
            .iter()
            .map(|product| ProductRow::new(product, &categories))
            .collect(),
        categories: categories.iter().map(CategoryRow::from).collect(),
        form,
        pending_deliveries: state.auto_delivery().pending(),
    })
}

// =============================================================================
// Order moderation
// =============================================================================

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    /// Status the admin saw when submitting.
    pub current: String,
}

/// Move an order to a new status.
#[instrument(skip(state, signed_in, headers, form), fields(status = %form.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let back = back_to(&headers, ORDERS_TAB);
    let (Ok(current), Ok(target)) = (
        OrderStatus::from_str(&form.current),
        OrderStatus::from_str(&form.status),
    ) else {
        return Ok(redirect_error(&back, "Invalid status change"));
    };
    if let Err(message) = validate_transition(current, target) {
        return Ok(redirect_error(&back, message));
    }

    let id = OrderId::new(id);
    let credentials = &signed_in.credentials;
    if let Err(e) = state
        .api()
        .admin_update_order_status(credentials, &id, target)
        .await
    {
        return Ok(redirect_error(&back, &inline_message(e)?));
    }

    if target == OrderStatus::Shipped {
        state
            .auto_delivery()
            .schedule(id.clone(), updater(&state, credentials));
    } else {
        state.auto_delivery().cancel(&id);
    }
    tracing::info!(order_id = %id, from = %current, to = %target, "Order status changed by admin");
    Ok(redirect_notice(&back, "Order status updated"))
}

/// Cancel an order on the customer's behalf.
#[instrument(skip(state, signed_in, headers))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let back = back_to(&headers, ORDERS_TAB);
    let id = OrderId::new(id);

    match state.api().cancel_order(&signed_in.credentials, &id).await {
        Ok(()) => {
            state.auto_delivery().cancel(&id);
            tracing::info!(order_id = %id, "Order cancelled by admin");
            Ok(redirect_notice(&back, "Order cancelled"))
        }
        Err(e) => Ok(redirect_error(&back, &inline_message(e)?)),
    }
}

// =============================================================================
// Products and categories
// =============================================================================

/// Create a product.
#[instrument(skip(state, signed_in, form))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return Ok(redirect_error(PRODUCTS_TAB, message)),
    };

    match state
        .api()
        .admin_create_product(&signed_in.credentials, &input)
        .await
    {
        Ok(_) => Ok(redirect_notice(PRODUCTS_TAB, "Product added")),
        Err(e) => Ok(redirect_error(PRODUCTS_TAB, &inline_message(e)?)),
    }
}

/// Save changes to a product.
#[instrument(skip(state, signed_in, form))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => {
            return Ok(redirect_error(&format!("{PRODUCTS_TAB}&edit={id}"), message));
        }
    };

    match state
        .api()
        .admin_update_product(&signed_in.credentials, &id, &input)
        .await
    {
        Ok(_) => Ok(redirect_notice(PRODUCTS_TAB, "Product updated")),
        Err(e) => Ok(redirect_error(PRODUCTS_TAB, &inline_message(e)?)),
    }
}

/// Delete a product.
#[instrument(skip(state, signed_in))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Redirect> {
    match state
        .api()
        .admin_delete_product(&signed_in.credentials, &ProductId::new(id))
        .await
    {
        Ok(()) => Ok(redirect_notice(PRODUCTS_TAB, "Product deleted")),
        Err(e) => Ok(redirect_error(PRODUCTS_TAB, &inline_message(e)?)),
    }
}

/// Create a category; its slug is derived from the name.
#[instrument(skip(state, signed_in, form))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return Ok(redirect_error(CATEGORIES_TAB, message)),
    };

    match state
        .api()
        .admin_create_category(&signed_in.credentials, &input)
        .await
    {
        Ok(_) => Ok(redirect_notice(CATEGORIES_TAB, "Category added")),
        Err(e) => Ok(redirect_error(CATEGORIES_TAB, &inline_message(e)?)),
    }
}

/// Rename a category.
#[instrument(skip(state, signed_in, form))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let input = match form.parse() {
        Ok(input) => input,
        Err(message) => return Ok(redirect_error(CATEGORIES_TAB, message)),
    };

    match state
        .api()
        .admin_update_category(&signed_in.credentials, &CategoryId::new(id), &input)
        .await
    {
        Ok(_) => Ok(redirect_notice(CATEGORIES_TAB, "Category updated")),
        Err(e) => Ok(redirect_error(CATEGORIES_TAB, &inline_message(e)?)),
    }
}

/// Delete a category.
#[instrument(skip(state, signed_in))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(signed_in): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Redirect> {
    match state
        .api()
        .admin_delete_category(&signed_in.credentials, &CategoryId::new(id))
        .await
    {
        Ok(()) => Ok(redirect_notice(CATEGORIES_TAB, "Category deleted")),
        Err(e) => Ok(redirect_error(CATEGORIES_TAB, &inline_message(e)?)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders() -> Vec<Order> {
        serde_json::from_value(json!([
            { "_id": "o1", "status": "delivered", "totalPrice": 100, "createdAt": "2024-01-01T00:00:00Z" },
            { "_id": "o2", "status": "cancelled", "totalPrice": 20.5, "createdAt": "2024-03-01T00:00:00Z" },
            { "_id": "o3", "status": "pending", "totalPrice": 4.5 },
            { "_id": "o4", "status": "shipped", "totalPrice": 10, "createdAt": "2024-02-01T00:00:00Z" },
        ]))
        .unwrap()
    }

    #[test]
    fn test_tab_from_query() {
        assert_eq!(AdminTab::from_query(None), AdminTab::Overview);
        assert_eq!(AdminTab::from_query(Some("orders")), AdminTab::Orders);
        assert_eq!(AdminTab::from_query(Some("bogus")), AdminTab::Overview);
    }

    #[test]
    fn test_stats_count_all_orders() {
        let stats = AdminStats::new(&orders(), 7, 3);
        assert_eq!(stats.orders, 4);
        assert_eq!(stats.revenue, "$135.00");
        assert_eq!(stats.products, 7);
        assert_eq!(stats.categories, 3);
    }

    #[test]
    fn test_recent_orders_newest_first() {
        let orders = orders();
        let ids: Vec<&str> = recent_orders(&orders, 3)
            .iter()
            .map(|order| order.id.as_str())
            .collect();
        assert_eq!(ids, vec!["o2", "o4", "o1"]);
    }

    #[test]
    fn test_validate_transition() {
        assert!(validate_transition(OrderStatus::Pending, OrderStatus::Confirmed).is_ok());
        assert!(validate_transition(OrderStatus::Shipped, OrderStatus::Cancelled).is_ok());
        assert_eq!(
            validate_transition(OrderStatus::Delivered, OrderStatus::Cancelled),
            Err("This order can no longer be changed")
        );
        assert_eq!(
            validate_transition(OrderStatus::Shipped, OrderStatus::Pending),
            Err("Invalid status change")
        );
    }

    #[derive(Clone)]
    struct ShippedUpdater;

    impl OrderStatusUpdater for ShippedUpdater {
        async fn current_status(&self, _: &OrderId) -> std::result::Result<OrderStatus, ApiError> {
            Ok(OrderStatus::Shipped)
        }

        async fn update_order_status(
            &self,
            _: &OrderId,
            _: OrderStatus,
        ) -> std::result::Result<(), ApiError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_orders_fallback_keeps_other_timers() {
        let scheduler = AutoDeliveryScheduler::new(std::time::Duration::from_secs(300));
        scheduler.schedule(OrderId::new("customer-order"), ShippedUpdater);

        let report = OrderListing::Own(orders()).reconcile_deliveries(&scheduler, &ShippedUpdater);
        assert_eq!(report, SyncReport { scheduled: 1, cancelled: 0 });
        assert!(scheduler.is_scheduled(&OrderId::new("customer-order")));
        assert!(scheduler.is_scheduled(&OrderId::new("o4")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_listing_cancels_missing_timers() {
        let scheduler = AutoDeliveryScheduler::new(std::time::Duration::from_secs(300));
        scheduler.schedule(OrderId::new("customer-order"), ShippedUpdater);

        let report = OrderListing::All(orders()).reconcile_deliveries(&scheduler, &ShippedUpdater);
        assert_eq!(report, SyncReport { scheduled: 1, cancelled: 1 });
        assert!(!scheduler.is_scheduled(&OrderId::new("customer-order")));
    }
}
