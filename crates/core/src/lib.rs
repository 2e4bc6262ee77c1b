//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `storefront` - Server-rendered marketplace storefront
//! - `api-proxy` - Pass-through proxy in front of the REST backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no HTTP
//! clients, no session access. This keeps it lightweight and testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, user roles and the order status machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
