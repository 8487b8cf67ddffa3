//! Order types for the order management engine.
//!
//! An [`Order`] is immutable except for its [`OrderStatus`], which moves
//! exactly once from `PENDING` to a terminal state:
//!
//! ```text
//!   ┌─────────┐   match    ┌─────────┐
//!   │ PENDING ├───────────▶│ MATCHED │
//!   └────┬────┘            └─────────┘
//!        │ cancel
//!        ▼
//!   ┌──────────┐
//!   │ CANCELED │
//!   └──────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AssetName, CustomerId, OmsError, OrderId, Result, asset::to_scale, constants};

/// Which way the order trades the named asset against cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Matched,
    Canceled,
}

impl OrderStatus {
    /// Can an order in this status move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Matched | Self::Canceled))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Matched => write!(f, "MATCHED"),
            Self::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// An unvalidated request to place an order, as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_id: CustomerId,
    pub asset_name: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub price: Decimal,
}

impl OrderRequest {
    #[must_use]
    pub fn new(
        customer_id: CustomerId,
        asset_name: impl Into<String>,
        side: OrderSide,
        size: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            customer_id,
            asset_name: asset_name.into(),
            side,
            size,
            price,
        }
    }

    /// Validate the request and build a PENDING [`Order`].
    ///
    /// Size is pinned to six decimals and price to four. Trailing zeros
    /// do not count against the scale limit.
    ///
    /// # Errors
    /// Returns [`OmsError::Validation`] for a bad asset name, a
    /// non-positive size or price, excess decimal places, or an order on
    /// the cash asset itself.
    pub fn into_order(self, cash_asset: &AssetName) -> Result<Order> {
        let asset_name = AssetName::parse(self.asset_name)?;
        if &asset_name == cash_asset {
            return Err(OmsError::validation(
                "asset_name",
                format!("cannot trade the cash asset {cash_asset} against itself"),
            ));
        }
        let size = require_positive_with_scale(self.size, constants::SIZE_SCALE, "size")?;
        let price = require_positive_with_scale(self.price, constants::PRICE_SCALE, "price")?;

        Ok(Order {
            id: OrderId::new(),
            customer_id: self.customer_id,
            asset_name,
            side: self.side,
            size,
            price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        })
    }
}

fn require_positive_with_scale(value: Decimal, max_scale: u32, field: &'static str) -> Result<Decimal> {
    if value <= Decimal::ZERO {
        return Err(OmsError::validation(field, format!("{field} must be > 0")));
    }
    if value.normalize().scale() > max_scale {
        return Err(OmsError::validation(
            field,
            format!("{field} scale exceeds {max_scale} decimals"),
        ));
    }
    Ok(to_scale(value, max_scale))
}

/// A customer's intent to buy or sell `size` units of `asset_name` at `price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub asset_name: AssetName,
    pub side: OrderSide,
    /// Units of `asset_name`, scale 6.
    pub size: Decimal,
    /// Cash per unit, scale 4.
    pub price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Cash value of the order (`price * size`) at ledger precision.
    ///
    /// Reserve, release and settlement all use this one figure, so the
    /// amount locked at creation is exactly the amount later freed.
    #[must_use]
    pub fn cash_notional(&self) -> Decimal {
        to_scale(self.price * self.size, constants::ASSET_SCALE)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy(customer_id: CustomerId, side: OrderSide, size: Decimal, price: Decimal) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            asset_name: AssetName::parse("XYZ").expect("valid asset name"),
            side,
            size: to_scale(size, constants::SIZE_SCALE),
            price: to_scale(price, constants::PRICE_SCALE),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
