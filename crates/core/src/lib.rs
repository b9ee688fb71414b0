//! Mocktail Core - Shared domain library.
//!
//! This crate provides the domain model used across all Mocktail Bar components:
//! - `storefront` - Public-facing menu, cart, checkout and account pages
//! - `cli` - Command-line tools for inspecting and seeding the store
//!
//! # Architecture
//!
//! The core crate contains only types and pure state machines - no I/O, no
//! storage access, no HTTP. Persistence lives in the storefront crate, which
//! moves these values in and out of durable key-value storage as JSON.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, credentials and statuses
//! - [`catalog`] - The static mocktail menu and its search/filter/sort
//! - [`cart`] - The cart state container (line items, quantities, totals)
//! - [`checkout`] - The shipping → payment → confirmation state machine
//! - [`user`] - User records and profile edits
//! - [`order`] - Order records created at checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod order;
pub mod types;
pub mod user;

pub use cart::{Cart, CartLineItem};
pub use catalog::{Catalog, Category, MenuQuery, Mocktail, SortKey};
pub use checkout::{
    CheckoutError, CheckoutFlow, CheckoutStage, Confirmation, OrderSummary, PaymentDetails,
    ShippingInfo,
};
pub use order::{NewOrder, Order};
pub use types::*;
pub use user::{NewUser, ProfileUpdate, User};
