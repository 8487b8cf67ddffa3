//! Balance model: one [`Asset`] row per (customer, asset name).
//!
//! Every row splits its `size` into a `usable` part (free to back new
//! orders) and a `reserved` part (locked by PENDING orders). The invariant
//! `size == usable + reserved` is restored by [`Asset::normalize`], which
//! the ledger applies on every write.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{AssetId, AssetName, CustomerId, constants};

/// Round half-up to `scale` decimals and pin the scale, so `5` becomes
/// `5.000000` at scale 6.
#[must_use]
pub fn to_scale(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// A customer's balance of a single asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    /// Row id; `None` until the row is first persisted.
    pub id: Option<AssetId>,
    pub customer_id: CustomerId,
    pub asset_name: AssetName,
    /// Always re-derived as `usable + reserved`; never trusted from callers.
    pub size: Decimal,
    /// Available for new orders.
    pub usable: Decimal,
    /// Locked against PENDING orders.
    pub reserved: Decimal,
    /// Row generation for optimistic concurrency. `0` = never persisted.
    pub version: u64,
    /// When the row was first persisted.
    pub created_at: Option<DateTime<Utc>>,
}

impl Asset {
    /// A zero-valued, not-yet-persisted balance.
    #[must_use]
    pub fn zero(customer_id: CustomerId, asset_name: AssetName) -> Self {
        Self {
            id: None,
            customer_id,
            asset_name,
            size: Decimal::ZERO,
            usable: Decimal::ZERO,
            reserved: Decimal::ZERO,
            version: 0,
            created_at: None,
        }
    }

    /// Whether this value came from (or has been written to) the store.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    #[must_use]
    pub fn has_insufficient_funds(&self, needed: Decimal) -> bool {
        self.usable < needed
    }

    /// True when fewer than `needed` units are reserved.
    #[must_use]
    pub fn has_insufficient_reserved(&self, needed: Decimal) -> bool {
        self.reserved < needed
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.usable < Decimal::ZERO || self.reserved < Decimal::ZERO
    }

    /// Round usable / reserved to [`constants::ASSET_SCALE`] and recompute
    /// `size` from them.
    pub fn normalize(&mut self) {
        self.usable = to_scale(self.usable, constants::ASSET_SCALE);
        self.reserved = to_scale(self.reserved, constants::ASSET_SCALE);
        self.size = to_scale(self.usable + self.reserved, constants::ASSET_SCALE);
    }

    /// `size == usable + reserved`.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.size == self.usable + self.reserved
    }
}
