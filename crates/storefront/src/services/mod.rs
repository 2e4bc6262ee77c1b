//! Background services for the storefront.
//!
//! # Services
//!
//! - `auto_delivery` - Moves shipped orders to delivered after a fixed delay

pub mod auto_delivery;

pub use auto_delivery::{AdminStatusUpdater, AutoDeliveryScheduler, OrderStatusUpdater};
