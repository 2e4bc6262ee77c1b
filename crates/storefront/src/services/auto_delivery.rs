//! Automatic delivery of shipped orders.
//!
//! Every order in `shipped` gets one timer. When the timer fires the order
//! is moved to `delivered` through the same status update an admin uses.
//! Timers live in a map keyed by order id:
//!
//! - [`AutoDeliveryScheduler::sync`] schedules timers for newly shipped
//!   orders and cancels timers of orders that are no longer shipped
//! - [`AutoDeliveryScheduler::schedule_shipped`] only adds timers, for
//!   order lists that do not cover every order
//! - a fired timer re-reads the order and delivers it only if it is still
//!   shipped, then removes its own entry
//! - [`AutoDeliveryScheduler::shutdown`] cancels everything

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{OrderId, OrderStatus};
use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::api::types::Order;
use crate::api::{ApiClient, ApiError, Credentials};

/// Reads and updates an order's status when a timer fires.
pub trait OrderStatusUpdater: Clone + Send + Sync + 'static {
    fn current_status(
        &self,
        order_id: &OrderId,
    ) -> impl Future<Output = Result<OrderStatus, ApiError>> + Send;

    fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Status updates made with an admin's credentials.
#[derive(Clone)]
pub struct AdminStatusUpdater {
    api: ApiClient,
    credentials: Credentials,
}

impl AdminStatusUpdater {
    #[must_use]
    pub const fn new(api: ApiClient, credentials: Credentials) -> Self {
        Self { api, credentials }
    }
}

impl OrderStatusUpdater for AdminStatusUpdater {
    async fn current_status(&self, order_id: &OrderId) -> Result<OrderStatus, ApiError> {
        let order = self.api.get_order(&self.credentials, order_id).await?;
        Ok(order.status)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        self.api
            .admin_update_order_status(&self.credentials, order_id, status)
            .await
    }
}

/// Outcome of a [`AutoDeliveryScheduler::sync`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub scheduled: usize,
    pub cancelled: usize,
}

/// Keyed set of auto-delivery timers.
///
/// Cheap to clone; clones share the timer map.
#[derive(Clone)]
pub struct AutoDeliveryScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    delay: Duration,
    timers: Mutex<HashMap<OrderId, AbortHandle>>,
}

impl AutoDeliveryScheduler {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                delay,
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Time between scheduling and delivery.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Reconcile timers with a fresh order list.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn sync<U: OrderStatusUpdater>(&self, orders: &[Order], updater: &U) -> SyncReport {
        let shipped: HashSet<&OrderId> = orders
            .iter()
            .filter(|order| order.status == OrderStatus::Shipped)
            .map(|order| &order.id)
            .collect();

        let mut report = SyncReport::default();
        let mut timers = self.inner.timers.lock();

        timers.retain(|order_id, handle| {
            if shipped.contains(order_id) {
                return true;
            }
            handle.abort();
            report.cancelled += 1;
            false
        });

        for order_id in shipped {
            if !timers.contains_key(order_id) {
                let handle = self.spawn_timer(order_id.clone(), updater.clone());
                timers.insert(order_id.clone(), handle);
                report.scheduled += 1;
            }
        }

        if report != SyncReport::default() {
            info!(
                scheduled = report.scheduled,
                cancelled = report.cancelled,
                pending = timers.len(),
                "Auto-delivery timers synced"
            );
        }
        report
    }

    /// Schedule every shipped order in `orders` that has no timer yet.
    /// Never cancels. Returns the number of timers added.
    pub fn schedule_shipped<U: OrderStatusUpdater>(&self, orders: &[Order], updater: &U) -> usize {
        let mut timers = self.inner.timers.lock();
        let mut scheduled = 0;
        for order in orders {
            if order.status != OrderStatus::Shipped || timers.contains_key(&order.id) {
                continue;
            }
            let handle = self.spawn_timer(order.id.clone(), updater.clone());
            timers.insert(order.id.clone(), handle);
            scheduled += 1;
        }
        if scheduled > 0 {
            info!(scheduled, pending = timers.len(), "Auto-delivery timers added");
        }
        scheduled
    }

    /// Schedule one order. Returns `false` if it already has a timer.
    pub fn schedule<U: OrderStatusUpdater>(&self, order_id: OrderId, updater: U) -> bool {
        let mut timers = self.inner.timers.lock();
        if timers.contains_key(&order_id) {
            return false;
        }
        let handle = self.spawn_timer(order_id.clone(), updater);
        timers.insert(order_id, handle);
        true
    }

    /// Cancel one order's timer. Returns whether one was pending.
    pub fn cancel(&self, order_id: &OrderId) -> bool {
        self.inner
            .timers
            .lock()
            .remove(order_id)
            .map(|handle| handle.abort())
            .is_some()
    }

    /// Whether `order_id` has a pending timer.
    #[must_use]
    pub fn is_scheduled(&self, order_id: &OrderId) -> bool {
        self.inner.timers.lock().contains_key(order_id)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.timers.lock().len()
    }

    /// Cancel every pending timer.
    pub fn shutdown(&self) {
        let mut timers = self.inner.timers.lock();
        let count = timers.len();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
        if count > 0 {
            info!(count, "Cancelled pending auto-delivery timers");
        }
    }

    fn spawn_timer<U: OrderStatusUpdater>(&self, order_id: OrderId, updater: U) -> AbortHandle {
        let inner = Arc::clone(&self.inner);
        let delay = inner.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            deliver(&updater, &order_id).await;
            inner.timers.lock().remove(&order_id);
        });
        task.abort_handle()
    }
}

/// Move a still-shipped order to delivered.
async fn deliver<U: OrderStatusUpdater>(updater: &U, order_id: &OrderId) {
    match updater.current_status(order_id).await {
        Ok(OrderStatus::Shipped) => {}
        Ok(status) => {
            info!(order_id = %order_id, status = %status, "Order no longer shipped, skipping auto-delivery");
            return;
        }
        Err(e) => {
            warn!(order_id = %order_id, error = %e, "Auto-delivery status check failed");
            return;
        }
    }
    match updater
        .update_order_status(order_id, OrderStatus::Delivered)
        .await
    {
        Ok(()) => info!(order_id = %order_id, "Order auto-delivered"),
        Err(e) => warn!(order_id = %order_id, error = %e, "Auto-delivery update failed"),
    }
}
