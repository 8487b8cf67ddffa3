//! In-process [`Store`] with row-level optimistic versioning.
//!
//! All state sits behind one `parking_lot::RwLock`. Reads take the read
//! lock and return clones; `commit` takes the write lock, validates the
//! whole change set, then applies it.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use oms_types::{
    Asset, AssetId, AssetName, CustomerId, OmsError, Order, OrderId, Result,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::store::{AssetFilter, ChangeSet, CommitReceipt, OrderFilter, OrderWrite, Page, PageRequest, Store};

type AssetKey = (CustomerId, AssetName);

#[derive(Debug, Default)]
struct State {
    assets: HashMap<AssetKey, Asset>,
    orders: HashMap<OrderId, Order>,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an asset row outside any version check.
    /// Fixture / migration path only.
    pub fn seed_asset(
        &self,
        customer_id: CustomerId,
        asset_name: &AssetName,
        usable: Decimal,
        reserved: Decimal,
    ) -> Asset {
        let mut state = self.state.write();
        let key = (customer_id, asset_name.clone());
        let mut asset = state
            .assets
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Asset::zero(customer_id, asset_name.clone()));
        asset.usable = usable;
        asset.reserved = reserved;
        stamp(&mut asset);
        state.assets.insert(key, asset.clone());
        asset
    }

    /// Number of asset rows stored.
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.state.read().assets.len()
    }

    /// Number of order rows stored.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.read().orders.len()
    }

    /// Every asset row, in no particular order.
    #[must_use]
    pub fn all_assets(&self) -> Vec<Asset> {
        self.state.read().assets.values().cloned().collect()
    }
}

/// Normalize, bump the version and fill in id / creation time.
fn stamp(asset: &mut Asset) {
    asset.normalize();
    asset.version += 1;
    if asset.id.is_none() {
        asset.id = Some(AssetId::new());
    }
    if asset.created_at.is_none() {
        asset.created_at = Some(Utc::now());
    }
}

fn asset_label(asset: &Asset) -> String {
    format!("asset {} of customer {}", asset.asset_name, asset.customer_id)
}

impl State {
    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        let mut seen: HashSet<AssetKey> = HashSet::with_capacity(changes.assets.len());
        for asset in &changes.assets {
            let key = (asset.customer_id, asset.asset_name.clone());
            if !seen.insert(key.clone()) {
                return Err(OmsError::Internal(format!(
                    "{} written twice in one change set",
                    asset_label(asset)
                )));
            }
            let stored = self.assets.get(&key).map_or(0, |a| a.version);
            if stored != asset.version {
                return Err(OmsError::concurrent_update(asset_label(asset)));
            }
            if asset.is_negative() {
                return Err(OmsError::NegativeBalance {
                    asset: asset.asset_name.to_string(),
                });
            }
        }

        let mut inserted: HashSet<OrderId> = HashSet::new();
        for write in &changes.orders {
            match write {
                OrderWrite::Insert(order) => {
                    if self.orders.contains_key(&order.id) || !inserted.insert(order.id) {
                        return Err(OmsError::DuplicateOrder(order.id));
                    }
                }
                OrderWrite::Transition { order_id, from, to } => {
                    if !from.can_transition_to(*to) {
                        return Err(OmsError::Internal(format!(
                            "illegal order transition {from} -> {to} for {order_id}"
                        )));
                    }
                    let current = self
                        .orders
                        .get(order_id)
                        .ok_or(OmsError::OrderNotFound(*order_id))?;
                    if current.status != *from {
                        return Err(OmsError::concurrent_update(format!("order {order_id}")));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load_asset(&self, customer_id: CustomerId, asset_name: &AssetName) -> Result<Option<Asset>> {
        Ok(self
            .state
            .read()
            .assets
            .get(&(customer_id, asset_name.clone()))
            .cloned())
    }

    fn load_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().orders.get(&order_id).cloned())
    }

    fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt> {
        let mut state = self.state.write();
        state.validate(&changes)?;

        let mut receipt = CommitReceipt {
            assets: Vec::with_capacity(changes.assets.len()),
            orders_written: changes.orders.len(),
        };
        for mut asset in changes.assets {
            stamp(&mut asset);
            state
                .assets
                .insert((asset.customer_id, asset.asset_name.clone()), asset.clone());
            receipt.assets.push(asset);
        }
        for write in changes.orders {
            match write {
                OrderWrite::Insert(order) => {
                    state.orders.insert(order.id, order);
                }
                OrderWrite::Transition { order_id, to, .. } => {
                    if let Some(order) = state.orders.get_mut(&order_id) {
                        order.status = to;
                    }
                }
            }
        }
        Ok(receipt)
    }

    fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let mut hits: Vec<Order> = self
            .state
            .read()
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(Page::slice(hits, page))
    }

    fn list_assets(&self, filter: &AssetFilter, page: PageRequest) -> Result<Page<Asset>> {
        let mut hits: Vec<Asset> = self
            .state
            .read()
            .assets
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.asset_name.cmp(&b.asset_name))
        });
        Ok(Page::slice(hits, page))
    }
}
