//! # oms-engine
//!
//! **Order engine**: the order lifecycle and the balance reservations
//! behind it.
//!
//! ## Architecture
//!
//! An order transition request (create / cancel / match) enters the
//! [`OrderService`], which:
//! 1. Validates the request or the order's current status
//! 2. Delegates the balance move to the [`ReservationEngine`]
//! 3. Stages the order insert or status change
//! 4. Commits assets and order together, re-running the whole step on an
//!    optimistic conflict
//!
//! [`AssetService`] serves asset lookups, listings and deposits over the
//! same store.

pub mod access;
pub mod assets;
pub mod lifecycle;
pub mod reservation;
pub mod telemetry;

pub use access::{AccessGuard, OwnerOrAdmin, Principal, Role};
pub use assets::AssetService;
pub use lifecycle::OrderService;
pub use reservation::ReservationEngine;
