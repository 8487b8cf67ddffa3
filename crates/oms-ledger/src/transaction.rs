//! Unit of work over a [`Store`].
//!
//! A transaction caches every asset it reads, stages asset and order
//! writes, and hands them to [`Store::commit`] in one piece. Nothing is
//! visible to other writers until `commit` succeeds; dropping an
//! uncommitted transaction discards its writes.

use std::collections::HashMap;

use oms_types::{Asset, AssetName, CustomerId, Order, OrderId, OrderStatus, Result};

use crate::ledger::BalanceLedger;
use crate::store::{ChangeSet, CommitReceipt, OrderWrite, Store};

type AssetKey = (CustomerId, AssetName);

/// Staged reads and writes for one order transition.
pub struct Transaction<'s> {
    store: &'s dyn Store,
    /// Rows read or staged so far; staged values shadow stored ones.
    assets: HashMap<AssetKey, Asset>,
    /// Keys of staged asset writes, in first-write order.
    dirty: Vec<AssetKey>,
    orders: Vec<OrderWrite>,
}

impl<'s> Transaction<'s> {
    /// Start an empty transaction against `store`.
    #[must_use]
    pub fn begin(store: &'s dyn Store) -> Self {
        Self {
            store,
            assets: HashMap::new(),
            dirty: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// The balance ledger view of this transaction.
    pub fn ledger(&mut self) -> BalanceLedger<'_, 's> {
        BalanceLedger::new(self)
    }

    pub(crate) fn store(&self) -> &'s dyn Store {
        self.store
    }

    /// Read an asset, preferring this transaction's own view.
    pub(crate) fn read_asset(
        &mut self,
        customer_id: CustomerId,
        asset_name: &AssetName,
    ) -> Result<Option<Asset>> {
        let key = (customer_id, asset_name.clone());
        if let Some(asset) = self.assets.get(&key) {
            return Ok(Some(asset.clone()));
        }
        let loaded = self.store.load_asset(customer_id, asset_name)?;
        if let Some(asset) = &loaded {
            self.assets.insert(key, asset.clone());
        }
        Ok(loaded)
    }

    pub(crate) fn stage_asset(&mut self, asset: Asset) {
        let key = (asset.customer_id, asset.asset_name.clone());
        if !self.dirty.contains(&key) {
            self.dirty.push(key.clone());
        }
        self.assets.insert(key, asset);
    }

    /// Fetch an order straight from the store.
    pub fn load_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.store.load_order(order_id)
    }

    /// Stage a new order.
    pub fn insert_order(&mut self, order: Order) {
        self.orders.push(OrderWrite::Insert(order));
    }

    /// Stage a status change; the commit fails if the stored status is no
    /// longer `from`.
    pub fn transition_order(&mut self, order_id: OrderId, from: OrderStatus, to: OrderStatus) {
        self.orders.push(OrderWrite::Transition { order_id, from, to });
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty() || !self.orders.is_empty()
    }

    /// Write everything staged, atomically.
    pub fn commit(mut self) -> Result<CommitReceipt> {
        let assets = self
            .dirty
            .iter()
            .filter_map(|key| self.assets.remove(key))
            .collect();
        let changes = ChangeSet {
            assets,
            orders: self.orders,
        };
        if changes.is_empty() {
            return Ok(CommitReceipt::default());
        }
        self.store.commit(changes)
    }
}
