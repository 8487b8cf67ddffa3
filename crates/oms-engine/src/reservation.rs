//! Reservation Engine: moves funds and units between usable and reserved.
//!
//! Every order has two legs: the cash asset and the traded asset. Which
//! one is locked depends on the side:
//!
//! | Stage  | BUY                                   | SELL                                   |
//! |--------|---------------------------------------|----------------------------------------|
//! | create | cash: usable → reserved (`notional`)  | asset: usable → reserved (`size`)      |
//! | cancel | cash: reserved → usable (`notional`)  | asset: reserved → usable (`size`)      |
//! | match  | cash: burn reserved; asset: +usable   | asset: burn reserved; cash: +usable    |
//!
//! The engine holds no state of its own. All reads and writes go through
//! the [`BalanceLedger`] of the caller's transaction.

use oms_ledger::BalanceLedger;
use oms_types::{Asset, AssetName, CustomerId, OmsError, Order, OrderSide, Result};
use rust_decimal::Decimal;

/// Balance moves for order create / cancel / match.
#[derive(Debug, Clone)]
pub struct ReservationEngine {
    cash_asset: AssetName,
}

impl ReservationEngine {
    #[must_use]
    pub fn new(cash_asset: AssetName) -> Self {
        Self { cash_asset }
    }

    /// The asset every order is priced in.
    #[must_use]
    pub fn cash_asset(&self) -> &AssetName {
        &self.cash_asset
    }

    /// Lock what a new order needs.
    ///
    /// # Errors
    /// - `AssetNotFound` if the customer holds no row for the locked leg
    /// - `InsufficientFunds` if its usable balance is below the amount
    pub fn reserve(&self, ledger: &mut BalanceLedger<'_, '_>, order: &Order) -> Result<()> {
        match order.side {
            OrderSide::Buy => lock(ledger, order.customer_id, &self.cash_asset, order.cash_notional()),
            OrderSide::Sell => lock(ledger, order.customer_id, &order.asset_name, order.size),
        }
    }

    /// Return a canceled order's locked amount to usable.
    ///
    /// # Errors
    /// `AssetNotFound` if the locked leg has no row, `InconsistentReservation`
    /// if less than the amount is reserved.
    pub fn release(&self, ledger: &mut BalanceLedger<'_, '_>, order: &Order) -> Result<()> {
        match order.side {
            OrderSide::Buy => unlock(ledger, order.customer_id, &self.cash_asset, order.cash_notional()),
            OrderSide::Sell => unlock(ledger, order.customer_id, &order.asset_name, order.size),
        }
    }

    /// Burn the locked leg and credit the opposite one, creating the
    /// credited row if needed.
    ///
    /// # Errors
    /// `AssetNotFound` if the locked leg has no row, `InconsistentReservation`
    /// if less than the amount is reserved.
    pub fn settle(&self, ledger: &mut BalanceLedger<'_, '_>, order: &Order) -> Result<()> {
        match order.side {
            OrderSide::Buy => {
                burn(ledger, order.customer_id, &self.cash_asset, order.cash_notional())?;
                credit(ledger, order.customer_id, &order.asset_name, order.size)
            }
            OrderSide::Sell => {
                burn(ledger, order.customer_id, &order.asset_name, order.size)?;
                credit(ledger, order.customer_id, &self.cash_asset, order.cash_notional())
            }
        }
    }
}

// =================================================================
// Single-row moves
// =================================================================

fn lock(
    ledger: &mut BalanceLedger<'_, '_>,
    customer_id: CustomerId,
    asset_name: &AssetName,
    amount: Decimal,
) -> Result<()> {
    let mut row = ledger.get(customer_id, asset_name)?;
    if row.has_insufficient_funds(amount) {
        tracing::warn!(
            customer = %customer_id,
            asset = %asset_name,
            needed = %amount,
            available = %row.usable,
            "Insufficient usable balance"
        );
        return Err(OmsError::InsufficientFunds {
            asset: asset_name.to_string(),
            needed: amount,
            available: row.usable,
        });
    }
    row.usable -= amount;
    row.reserved += amount;
    ledger.upsert(row)?;
    Ok(())
}

fn unlock(
    ledger: &mut BalanceLedger<'_, '_>,
    customer_id: CustomerId,
    asset_name: &AssetName,
    amount: Decimal,
) -> Result<()> {
    let mut row = reserved_row(ledger, customer_id, asset_name, amount)?;
    row.reserved -= amount;
    row.usable += amount;
    ledger.upsert(row)?;
    Ok(())
}

fn burn(
    ledger: &mut BalanceLedger<'_, '_>,
    customer_id: CustomerId,
    asset_name: &AssetName,
    amount: Decimal,
) -> Result<()> {
    let mut row = reserved_row(ledger, customer_id, asset_name, amount)?;
    row.reserved -= amount;
    ledger.upsert(row)?;
    Ok(())
}

/// Credit usable, creating the row at zero reserved if needed.
fn credit(
    ledger: &mut BalanceLedger<'_, '_>,
    customer_id: CustomerId,
    asset_name: &AssetName,
    amount: Decimal,
) -> Result<()> {
    let mut row = ledger.get_or_create(customer_id, asset_name)?;
    row.usable += amount;
    ledger.upsert(row)?;
    Ok(())
}

/// The row holding at least `amount` reserved.
fn reserved_row(
    ledger: &mut BalanceLedger<'_, '_>,
    customer_id: CustomerId,
    asset_name: &AssetName,
    amount: Decimal,
) -> Result<Asset> {
    let row = ledger.get(customer_id, asset_name)?;
    if row.has_insufficient_reserved(amount) {
        tracing::warn!(
            customer = %customer_id,
            asset = %asset_name,
            needed = %amount,
            reserved = %row.reserved,
            "Reserved balance lower than the order holds"
        );
        return Err(OmsError::InconsistentReservation {
            asset: asset_name.to_string(),
            needed: amount,
            reserved: row.reserved,
        });
    }
    Ok(row)
}
