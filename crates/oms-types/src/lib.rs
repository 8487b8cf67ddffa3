//! # oms-types
//!
//! Shared types, errors, and configuration for the brokerage **OMS**
//! (order management system).
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`CustomerId`], [`AssetId`], [`AssetName`]
//! - **Balance model**: [`Asset`] (size / usable / reserved per customer + asset)
//! - **Order model**: [`Order`], [`OrderRequest`], [`OrderSide`], [`OrderStatus`]
//! - **Configuration**: [`OrderServiceConfig`]
//! - **Errors**: [`OmsError`] with `OMS_ERR_` prefix codes
//! - **Constants**: decimal scales, name limits and defaults

pub mod asset;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use oms_types::{Asset, Order, OrderSide, OmsError, ...};

pub use asset::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use order::*;

// Constants are accessed via `oms_types::constants::FOO`
// (not re-exported to avoid name collisions).
