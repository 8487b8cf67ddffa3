//! Asset lookups, listings and deposits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use oms_ledger::{AssetFilter, ConflictRetry, Page, PageRequest, Store, Transaction};
use oms_types::{Asset, AssetName, CustomerId, OmsError, OrderServiceConfig, Result, constants};
use rust_decimal::Decimal;

/// Read access to asset rows plus the funding path.
pub struct AssetService {
    store: Arc<dyn Store>,
    retry: ConflictRetry,
    config: OrderServiceConfig,
}

impl AssetService {
    /// # Errors
    /// `Configuration` if `config` does not validate.
    pub fn new(store: Arc<dyn Store>, config: OrderServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            retry: ConflictRetry::from_config(&config),
            config,
        })
    }

    /// # Errors
    /// `AssetNotFound` if the customer holds no row for `asset_name`.
    pub fn get_asset(&self, customer_id: CustomerId, asset_name: &AssetName) -> Result<Asset> {
        self.store.load_asset(customer_id, asset_name)?.ok_or_else(|| {
            tracing::warn!(customer = %customer_id, asset = %asset_name, "Asset not found");
            OmsError::AssetNotFound {
                customer_id,
                asset: asset_name.to_string(),
            }
        })
    }

    /// A customer's asset rows created within `[from, to]`, newest first.
    ///
    /// # Errors
    /// `Validation` if the window is inverted.
    pub fn list_assets(
        &self,
        customer_id: CustomerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<Page<Asset>> {
        if from > to {
            return Err(OmsError::validation("from", "window start is after its end"));
        }
        let page = page.clamped(self.config.default_page_size, self.config.max_page_size);
        self.store
            .list_assets(&AssetFilter { customer_id, from, to }, page)
    }

    /// Credit `amount` to usable, creating the row if needed.
    ///
    /// # Errors
    /// - `Validation` if `amount` is not positive or has more than six
    ///   decimals
    /// - `ConcurrentUpdate` once retries are exhausted
    pub fn deposit(&self, customer_id: CustomerId, asset_name: &AssetName, amount: Decimal) -> Result<Asset> {
        if amount <= Decimal::ZERO {
            return Err(OmsError::validation("amount", "amount must be > 0"));
        }
        if amount.normalize().scale() > constants::ASSET_SCALE {
            return Err(OmsError::validation(
                "amount",
                format!("amount scale exceeds {} decimals", constants::ASSET_SCALE),
            ));
        }

        let asset = self.retry.run("deposit", |_| {
            let mut tx = Transaction::begin(self.store.as_ref());
            let mut row = tx.ledger().get_or_create(customer_id, asset_name)?;
            row.usable += amount;
            tx.ledger().upsert(row)?;
            let receipt = tx.commit()?;
            receipt
                .asset(customer_id, asset_name)
                .cloned()
                .ok_or_else(|| OmsError::Internal(format!("deposit of {asset_name} was not written")))
        })?;

        tracing::info!(
            customer = %customer_id,
            asset = %asset_name,
            amount = %amount,
            usable = %asset.usable,
            "Deposit credited"
        );
        Ok(asset)
    }
}
