//! The persistence seam.
//!
//! A [`Store`] offers row fetch, an atomic versioned [`Store::commit`] and
//! filtered, paginated listings. Implementations must make `commit`
//! all-or-nothing: every version and expected-status check passes before
//! any row is written.

use chrono::{DateTime, Utc};
use oms_types::{Asset, AssetName, CustomerId, Order, OrderId, OrderStatus, Result};

/// Storage collaborator for assets and orders.
pub trait Store: Send + Sync {
    /// Fetch the asset row for a customer + asset, if one exists.
    fn load_asset(&self, customer_id: CustomerId, asset_name: &AssetName) -> Result<Option<Asset>>;

    /// Fetch an order by id.
    fn load_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Apply a change set atomically.
    ///
    /// # Errors
    /// - `ConcurrentUpdate` if an asset's version or an order's status no
    ///   longer matches what the writer read
    /// - `DuplicateOrder` if an inserted order id already exists
    /// - `OrderNotFound` if a transitioned order does not exist
    /// - `NegativeBalance` if an asset write has negative usable / reserved
    fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt>;

    /// Orders matching `filter`, newest first.
    fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>>;

    /// Asset rows matching `filter`, newest first.
    fn list_assets(&self, filter: &AssetFilter, page: PageRequest) -> Result<Page<Asset>>;
}

/// A single order write inside a [`ChangeSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderWrite {
    /// Persist a new order.
    Insert(Order),
    /// Move an existing order from `from` to `to`. Rejected as a
    /// concurrent update if the stored status is no longer `from`.
    Transition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// Everything one unit of work wants to write.
///
/// Each asset carries the version it was read at (`0` for a row that did
/// not exist yet).
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub assets: Vec<Asset>,
    pub orders: Vec<OrderWrite>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.orders.is_empty()
    }
}

/// What a successful commit wrote.
#[derive(Debug, Clone, Default)]
pub struct CommitReceipt {
    /// Asset rows as stored, with their new versions.
    pub assets: Vec<Asset>,
    /// Number of order rows inserted or transitioned.
    pub orders_written: usize,
}

impl CommitReceipt {
    /// The committed row for a customer + asset, if this commit wrote it.
    #[must_use]
    pub fn asset(&self, customer_id: CustomerId, asset_name: &AssetName) -> Option<&Asset> {
        self.assets
            .iter()
            .find(|a| a.customer_id == customer_id && &a.asset_name == asset_name)
    }
}

/// Order listing filter. Customer and time window are required.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub customer_id: CustomerId,
    /// Inclusive lower bound on `created_at`.
    pub from: DateTime<Utc>,
    /// Inclusive upper bound on `created_at`.
    pub to: DateTime<Utc>,
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring of the asset name.
    pub asset_name_contains: Option<String>,
}

impl OrderFilter {
    #[must_use]
    pub fn new(customer_id: CustomerId, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            customer_id,
            from,
            to,
            status: None,
            asset_name_contains: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_asset_name(mut self, needle: impl Into<String>) -> Self {
        self.asset_name_contains = Some(needle.into());
        self
    }

    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        if order.customer_id != self.customer_id {
            return false;
        }
        if order.created_at < self.from || order.created_at > self.to {
            return false;
        }
        if self.status.is_some_and(|s| s != order.status) {
            return false;
        }
        match self.asset_name_contains.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => order
                .asset_name
                .as_str()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// Asset listing filter on the row creation time.
#[derive(Debug, Clone)]
pub struct AssetFilter {
    pub customer_id: CustomerId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl AssetFilter {
    #[must_use]
    pub fn matches(&self, asset: &Asset) -> bool {
        asset.customer_id == self.customer_id
            && asset
                .created_at
                .is_some_and(|at| at >= self.from && at <= self.to)
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    /// Replace a zero size with `default_size` and cap at `max_size`.
    #[must_use]
    pub fn clamped(self, default_size: usize, max_size: usize) -> Self {
        let size = if self.size == 0 { default_size } else { self.size };
        Self {
            page: self.page,
            size: size.clamp(1, max_size.max(1)),
        }
    }

    fn offset(self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cut one page out of an already sorted result set.
    #[must_use]
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len();
        let size = request.size.max(1);
        let total_pages = total_items.div_ceil(size);
        let items = all.into_iter().skip(request.offset()).take(size).collect();
        Self {
            items,
            page: request.page,
            size,
            total_items,
            total_pages,
        }
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.page + 1 >= self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_types::OrderSide;
    use rust_decimal::Decimal;

    #[test]
    fn page_slice_metadata() {
        let page = Page::slice((0..45).collect::<Vec<_>>(), PageRequest::new(2, 20));
        assert_eq!(page.items, (40..45).collect::<Vec<_>>());
        assert_eq!(page.total_items, 45);
        assert_eq!(page.total_pages, 3);
        assert!(page.is_last());
    }

    #[test]
    fn page_past_end_is_empty() {
        let page = Page::slice(vec![1, 2, 3], PageRequest::new(5, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn page_request_clamping() {
        assert_eq!(PageRequest::new(0, 0).clamped(20, 100).size, 20);
        assert_eq!(PageRequest::new(0, 500).clamped(20, 100).size, 100);
        assert_eq!(PageRequest::new(3, 7).clamped(20, 100), PageRequest::new(3, 7));
    }

    #[test]
    fn order_filter_asset_substring_is_case_insensitive() {
        let customer = CustomerId::new();
        let order = Order::dummy(customer, OrderSide::Buy, Decimal::ONE, Decimal::ONE);
        let window = OrderFilter::new(
            customer,
            order.created_at - chrono::Duration::minutes(1),
            order.created_at + chrono::Duration::minutes(1),
        );
        assert!(window.clone().with_asset_name("xy").matches(&order));
        assert!(window.clone().with_asset_name("  ").matches(&order));
        assert!(!window.clone().with_asset_name("abc").matches(&order));
        assert!(window.clone().with_status(OrderStatus::Pending).matches(&order));
        assert!(!window.with_status(OrderStatus::Matched).matches(&order));
    }

    #[test]
    fn order_filter_window_is_inclusive() {
        let customer = CustomerId::new();
        let order = Order::dummy(customer, OrderSide::Sell, Decimal::ONE, Decimal::ONE);
        let exact = OrderFilter::new(customer, order.created_at, order.created_at);
        assert!(exact.matches(&order));
        let other = OrderFilter::new(CustomerId::new(), order.created_at, order.created_at);
        assert!(!other.matches(&order));
    }
}
