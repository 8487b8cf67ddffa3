//! The Balance Ledger: asset row access inside a [`Transaction`].
//!
//! The ledger is the only writer of asset rows. On every `upsert` it
//! re-derives `size` from `usable + reserved` (half-up, six decimals),
//! so a caller-supplied `size` is never trusted.

use oms_types::{Asset, AssetName, CustomerId, OmsError, Result};

use crate::transaction::Transaction;

/// Asset reads and writes scoped to one transaction.
pub struct BalanceLedger<'t, 's> {
    tx: &'t mut Transaction<'s>,
}

impl<'t, 's> BalanceLedger<'t, 's> {
    pub(crate) fn new(tx: &'t mut Transaction<'s>) -> Self {
        Self { tx }
    }

    /// The asset row for a customer + asset.
    ///
    /// # Errors
    /// Returns `AssetNotFound` if no row exists.
    pub fn get(&mut self, customer_id: CustomerId, asset_name: &AssetName) -> Result<Asset> {
        self.tx.read_asset(customer_id, asset_name)?.ok_or_else(|| {
            tracing::warn!(
                customer = %customer_id,
                asset = %asset_name,
                "Asset not found"
            );
            OmsError::AssetNotFound {
                customer_id,
                asset: asset_name.to_string(),
            }
        })
    }

    /// The existing row, or a zero balance that is persisted on the next
    /// `upsert`.
    pub fn get_or_create(&mut self, customer_id: CustomerId, asset_name: &AssetName) -> Result<Asset> {
        Ok(self
            .tx
            .read_asset(customer_id, asset_name)?
            .unwrap_or_else(|| Asset::zero(customer_id, asset_name.clone())))
    }

    /// Stage a write of `asset`'s usable / reserved balances.
    ///
    /// The version the asset was read at must still be the stored version;
    /// the check runs here and again, atomically, at commit.
    ///
    /// # Errors
    /// - `NegativeBalance` if usable or reserved is below zero
    /// - `ConcurrentUpdate` if another writer committed this row since it
    ///   was read
    pub fn upsert(&mut self, mut asset: Asset) -> Result<Asset> {
        if asset.is_negative() {
            return Err(OmsError::NegativeBalance {
                asset: asset.asset_name.to_string(),
            });
        }

        let stored_version = self
            .tx
            .store()
            .load_asset(asset.customer_id, &asset.asset_name)?
            .map_or(0, |row| row.version);
        if stored_version != asset.version {
            tracing::debug!(
                customer = %asset.customer_id,
                asset = %asset.asset_name,
                read_version = asset.version,
                stored_version,
                "Stale asset write rejected"
            );
            return Err(OmsError::concurrent_update(format!(
                "asset {} of customer {}",
                asset.asset_name, asset.customer_id
            )));
        }

        asset.normalize();
        tracing::debug!(
            customer = %asset.customer_id,
            asset = %asset.asset_name,
            usable = %asset.usable,
            reserved = %asset.reserved,
            size = %asset.size,
            "Asset staged"
        );
        self.tx.stage_asset(asset.clone());
        Ok(asset)
    }
}
