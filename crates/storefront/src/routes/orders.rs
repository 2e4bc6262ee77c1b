//! Order history, order details and cancellation.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use bazaar_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tracing::instrument;

use super::views::{Flash, SelectOption, Shell, format_date, redirect_error, redirect_notice};
use crate::api::types::Order;
use crate::error::{Result, inline_message};
use crate::middleware::RequireAuth;
use crate::state::AppState;

// =============================================================================
// Status filter
// =============================================================================

/// Status filter query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// Parse a status filter; `all`, empty and unknown values mean no filter.
#[must_use]
pub fn parse_status_filter(value: Option<&str>) -> Option<OrderStatus> {
    value.and_then(|v| OrderStatus::from_str(v).ok())
}

/// Orders matching `filter`.
#[must_use]
pub fn filter_orders(orders: &[Order], filter: Option<OrderStatus>) -> Vec<&Order> {
    orders
        .iter()
        .filter(|order| filter.is_none_or(|status| order.status == status))
        .collect()
}

/// Filter tabs: "All" followed by every status.
#[must_use]
pub fn status_tabs(selected: Option<OrderStatus>) -> Vec<SelectOption> {
    std::iter::once(SelectOption {
        value: "all".to_string(),
        label: "All".to_string(),
        selected: selected.is_none(),
    })
    .chain(OrderStatus::ALL.into_iter().map(|status| SelectOption {
        value: status.as_str().to_string(),
        label: status.label().to_string(),
        selected: selected == Some(status),
    }))
    .collect()
}

// =============================================================================
// Views
// =============================================================================

/// An order row in lists.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub reference: String,
    pub date: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub total: String,
    pub item_count: u32,
    pub customer: String,
    pub can_cancel: bool,
    /// Wire name of the next fulfillment step.
    pub next_status: Option<&'static str>,
    pub next_label: &'static str,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            reference: order.id.short(),
            date: format_date(order.created_at),
            status: order.status.as_str(),
            status_label: order.status.label(),
            total: order.total_price.display(),
            item_count: order.item_count(),
            customer: order.shipping_address.full_name.clone(),
            can_cancel: !order.status.is_terminal(),
            next_status: order.status.next().map(|status| status.as_str()),
            next_label: order.status.next().map_or("", |status| status.label()),
        }
    }
}

/// One step of the progress tracker.
#[derive(Debug, Clone)]
pub struct ProgressStep {
    pub label: &'static str,
    pub reached: bool,
    pub current: bool,
}

/// Progress steps for `status`. Cancelled orders reach no step.
#[must_use]
pub fn progress_steps(status: OrderStatus) -> Vec<ProgressStep> {
    let reached = status.step_index();
    OrderStatus::PROGRESSION
        .iter()
        .enumerate()
        .map(|(index, step)| ProgressStep {
            label: step.label(),
            reached: reached.is_some_and(|r| index <= r),
            current: reached == Some(index),
        })
        .collect()
}

/// An order line as displayed.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub tabs: Vec<SelectOption>,
    pub orders: Vec<OrderRow>,
}

/// Order details template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub shell: Shell,
    pub flash: Flash,
    pub order: OrderRow,
    pub cancelled: bool,
    pub steps: Vec<ProgressStep>,
    pub lines: Vec<OrderLineView>,
    pub address_lines: Vec<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display order history with an optional status filter.
#[instrument(skip(state, signed_in))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Query(query): Query<StatusQuery>,
    Query(mut flash): Query<Flash>,
) -> Result<OrdersIndexTemplate> {
    let filter = parse_status_filter(query.status.as_deref());

    let orders = match state.api().my_orders(&signed_in.credentials).await {
        Ok(orders) => orders,
        Err(e) => {
            flash.error = Some(inline_message(e)?);
            Vec::new()
        }
    };

    Ok(OrdersIndexTemplate {
        shell: Shell::load(&state, &signed_in.visitor).await?,
        flash,
        tabs: status_tabs(filter),
        orders: filter_orders(&orders, filter)
            .into_iter()
            .map(OrderRow::from)
            .collect(),
    })
}

/// Display one order with its progress.
#[instrument(skip(state, signed_in))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Path(id): Path<String>,
    Query(flash): Query<Flash>,
) -> Result<OrderShowTemplate> {
    let order = state
        .api()
        .get_order(&signed_in.credentials, &OrderId::new(id))
        .await?;

    let address = &order.shipping_address;
    let address_lines = [
        address.full_name.clone(),
        address.address.clone(),
        format!("{} {}", address.city, address.zip_code).trim().to_string(),
        address.phone.clone(),
    ]
    .into_iter()
    .filter(|line| !line.is_empty())
    .collect();

    Ok(OrderShowTemplate {
        shell: Shell::load(&state, &signed_in.visitor).await?,
        flash,
        cancelled: order.status == OrderStatus::Cancelled,
        steps: progress_steps(order.status),
        lines: order
            .items
            .iter()
            .map(|item| OrderLineView {
                product_id: item.product.id().to_string(),
                name: item.display_name(),
                quantity: item.quantity,
                price: item.price.display(),
                line_total: item.line_total().display(),
            })
            .collect(),
        address_lines,
        notes: order.notes.clone().filter(|n| !n.trim().is_empty()),
        order: OrderRow::from(&order),
    })
}

/// Cancel an order that has not reached a terminal state.
#[instrument(skip(state, signed_in))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(signed_in): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = OrderId::new(id);
    let path = format!("/orders/{id}");

    let order = state.api().get_order(&signed_in.credentials, &id).await?;
    if order.status.is_terminal() {
        return Ok(redirect_error(&path, "This order can no longer be cancelled"));
    }

    match state.api().cancel_order(&signed_in.credentials, &id).await {
        Ok(()) => {
            state.auto_delivery().cancel(&id);
            tracing::info!(order_id = %id, "Order cancelled by customer");
            Ok(redirect_notice(&path, "Order cancelled"))
        }
        Err(e) => Ok(redirect_error(&path, &inline_message(e)?)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(id: &str, status: &str) -> Order {
        serde_json::from_value(json!({ "_id": id, "status": status, "totalPrice": 12.5 })).unwrap()
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(parse_status_filter(None), None);
        assert_eq!(parse_status_filter(Some("all")), None);
        assert_eq!(
            parse_status_filter(Some("shipped")),
            Some(OrderStatus::Shipped)
        );

        let orders = [order("a", "pending"), order("b", "shipped")];
        let shipped = filter_orders(&orders, Some(OrderStatus::Shipped));
        assert_eq!(shipped.len(), 1);
        assert_eq!(shipped[0].id.as_str(), "b");
        assert_eq!(filter_orders(&orders, None).len(), 2);
    }

    #[test]
    fn test_status_tabs_mark_selection() {
        let tabs = status_tabs(Some(OrderStatus::Delivered));
        assert_eq!(tabs.len(), 6);
        assert!(!tabs[0].selected);
        assert!(tabs.iter().any(|t| t.value == "delivered" && t.selected));
    }

    #[test]
    fn test_progress_steps() {
        let steps = progress_steps(OrderStatus::Shipped);
        let reached: Vec<bool> = steps.iter().map(|s| s.reached).collect();
        assert_eq!(reached, vec![true, true, true, false]);
        assert!(steps[2].current);

        assert!(
            progress_steps(OrderStatus::Cancelled)
                .iter()
                .all(|s| !s.reached)
        );
    }

    #[test]
    fn test_order_row() {
        let row = OrderRow::from(&order("64f1c0aa11bb22cc", "confirmed"));
        assert!(row.can_cancel);
        assert_eq!(row.next_status, Some("shipped"));
        assert_eq!(row.next_label, "Shipped");
        assert_eq!(row.total, "$12.50");

        let row = OrderRow::from(&order("x", "delivered"));
        assert!(!row.can_cancel);
        assert_eq!(row.next_status, None);
    }
}
