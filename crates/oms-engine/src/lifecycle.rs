//! Order Lifecycle Manager.
//!
//! Every transition runs as one unit of work under the conflict retry:
//!
//! ```text
//! retry {
//!     begin → load order / check status → reserve | release | settle
//!         → insert | transition order → commit
//! }
//! ```
//!
//! A retry starts from a fresh transaction, so it re-reads the order as
//! well as the asset rows. The order write carries the status it was read
//! in; two racing cancels of one order release funds once and the loser
//! sees `NotCancellable`.

use std::sync::Arc;

use oms_ledger::{ConflictRetry, OrderFilter, Page, PageRequest, Store, Transaction};
use oms_types::{OmsError, Order, OrderId, OrderRequest, OrderServiceConfig, OrderStatus, Result};

use crate::access::{AccessGuard, OwnerOrAdmin, Principal};
use crate::reservation::ReservationEngine;

/// Create, cancel, match and look up orders.
pub struct OrderService {
    store: Arc<dyn Store>,
    engine: ReservationEngine,
    retry: ConflictRetry,
    guard: Arc<dyn AccessGuard>,
    config: OrderServiceConfig,
}

impl OrderService {
    /// # Errors
    /// `Configuration` if `config` does not validate.
    pub fn new(store: Arc<dyn Store>, config: OrderServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            engine: ReservationEngine::new(config.cash_asset_name()?),
            retry: ConflictRetry::from_config(&config),
            guard: Arc::new(OwnerOrAdmin),
            config,
        })
    }

    /// Replace the default owner-or-admin guard.
    #[must_use]
    pub fn with_guard(mut self, guard: Arc<dyn AccessGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Validate a request, lock its funds and persist it as PENDING.
    ///
    /// # Errors
    /// - `Validation` for a malformed request
    /// - `AssetNotFound` if the customer holds no row for the locked leg
    /// - `InsufficientFunds` if the locked leg is short
    /// - `ConcurrentUpdate` once retries are exhausted
    pub fn create_order(&self, request: OrderRequest) -> Result<Order> {
        let order = request.into_order(self.engine.cash_asset())?;

        self.retry.run("create_order", |_| {
            let mut tx = Transaction::begin(self.store.as_ref());
            self.engine.reserve(&mut tx.ledger(), &order)?;
            tx.insert_order(order.clone());
            tx.commit()
        })?;

        tracing::info!(
            order = %order.id,
            customer = %order.customer_id,
            asset = %order.asset_name,
            side = %order.side,
            size = %order.size,
            price = %order.price,
            "Order created"
        );
        Ok(order)
    }

    /// Cancel a PENDING order and release its locked amount.
    ///
    /// Access is not checked here; see [`OrderService::cancel_order_as`].
    ///
    /// # Errors
    /// - `OrderNotFound`
    /// - `NotCancellable` if the order is not PENDING
    /// - `AssetNotFound` if the locked leg's row is gone
    /// - `InconsistentReservation` if the ledger holds less than the order
    /// - `ConcurrentUpdate` once retries are exhausted
    pub fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.retry.run("cancel_order", |_| {
            let mut tx = Transaction::begin(self.store.as_ref());
            let order = load(&tx, order_id)?;
            if !order.is_pending() {
                tracing::warn!(order = %order_id, status = %order.status, "Cancel rejected");
                return Err(OmsError::NotCancellable {
                    order_id,
                    status: order.status,
                });
            }
            let released = self.engine.release(&mut tx.ledger(), &order);
            released.map_err(|e| lost_race(&tx, &order, e))?;
            tx.transition_order(order_id, OrderStatus::Pending, OrderStatus::Canceled);
            tx.commit()?;
            Ok(Order {
                status: OrderStatus::Canceled,
                ..order
            })
        })?;

        tracing::info!(order = %order.id, customer = %order.customer_id, "Order canceled");
        Ok(order)
    }

    /// Cancel on behalf of `principal`, who must own the order or be an admin.
    ///
    /// # Errors
    /// `AccessDenied` in addition to everything [`OrderService::cancel_order`]
    /// returns.
    pub fn cancel_order_as(&self, principal: &Principal, order_id: OrderId) -> Result<Order> {
        let order = self.get_order(order_id)?;
        self.guard.check_customer_access(principal, order.customer_id)?;
        self.cancel_order(order_id)
    }

    /// Settle a PENDING order: burn the locked leg, credit the other one.
    ///
    /// # Errors
    /// - `OrderNotFound`
    /// - `NotMatchable` if the order is not PENDING
    /// - `AssetNotFound` if the locked leg's row is gone
    /// - `InconsistentReservation` if the ledger holds less than the order
    /// - `ConcurrentUpdate` once retries are exhausted
    pub fn match_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.retry.run("match_order", |_| {
            let mut tx = Transaction::begin(self.store.as_ref());
            let order = load(&tx, order_id)?;
            if !order.is_pending() {
                tracing::warn!(order = %order_id, status = %order.status, "Match rejected");
                return Err(OmsError::NotMatchable {
                    order_id,
                    status: order.status,
                });
            }
            let settled = self.engine.settle(&mut tx.ledger(), &order);
            settled.map_err(|e| lost_race(&tx, &order, e))?;
            tx.transition_order(order_id, OrderStatus::Pending, OrderStatus::Matched);
            tx.commit()?;
            Ok(Order {
                status: OrderStatus::Matched,
                ..order
            })
        })?;

        tracing::info!(
            order = %order.id,
            customer = %order.customer_id,
            side = %order.side,
            "Order matched"
        );
        Ok(order)
    }

    /// # Errors
    /// `OrderNotFound` if no such order exists.
    pub fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store.load_order(order_id)?.ok_or_else(|| {
            tracing::warn!(order = %order_id, "Order not found");
            OmsError::OrderNotFound(order_id)
        })
    }

    /// A customer's orders in a creation-time window, newest first.
    ///
    /// # Errors
    /// `Validation` if the window is inverted.
    pub fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        if filter.from > filter.to {
            return Err(OmsError::validation("from", "window start is after its end"));
        }
        let page = page.clamped(self.config.default_page_size, self.config.max_page_size);
        self.store.list_orders(filter, page)
    }
}

fn load(tx: &Transaction<'_>, order_id: OrderId) -> Result<Order> {
    tx.load_order(order_id)?.ok_or_else(|| {
        tracing::warn!(order = %order_id, "Order not found");
        OmsError::OrderNotFound(order_id)
    })
}

/// A reserved shortfall seen after the order itself moved on means another
/// transition committed between our order read and asset read.
fn lost_race(tx: &Transaction<'_>, order: &Order, err: OmsError) -> OmsError {
    if !matches!(err, OmsError::InconsistentReservation { .. }) {
        return err;
    }
    match tx.load_order(order.id) {
        Ok(Some(current)) if current.status != order.status => {
            OmsError::concurrent_update(format!("order {}", order.id))
        }
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use oms_ledger::{AssetFilter, ChangeSet, CommitReceipt, MemoryStore};
    use oms_types::{Asset, AssetName, CustomerId, ErrorClass, OrderSide};
    use rust_decimal::Decimal;

    type Hook = Box<dyn FnOnce() + Send>;

    /// Delegates to a [`MemoryStore`], recording every order status it hands
    /// out. An optional hook runs once, on the first asset read that follows
    /// an order read, before that asset read reaches the inner store.
    struct InterleavingStore {
        inner: Arc<MemoryStore>,
        seen: Mutex<Vec<OrderStatus>>,
        hook: Mutex<Option<Hook>>,
    }

    impl InterleavingStore {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                seen: Mutex::new(Vec::new()),
                hook: Mutex::new(None),
            }
        }

        fn with_hook(self, hook: impl FnOnce() + Send + 'static) -> Self {
            *self.hook.lock().unwrap() = Some(Box::new(hook));
            self
        }

        fn seen(&self) -> Vec<OrderStatus> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Store for InterleavingStore {
        fn load_asset(&self, customer_id: CustomerId, asset_name: &AssetName) -> Result<Option<Asset>> {
            let after_order_read = !self.seen.lock().unwrap().is_empty();
            let hook = if after_order_read { self.hook.lock().unwrap().take() } else { None };
            if let Some(hook) = hook {
                hook();
            }
            self.inner.load_asset(customer_id, asset_name)
        }

        fn load_order(&self, order_id: OrderId) -> Result<Option<Order>> {
            let order = self.inner.load_order(order_id)?;
            if let Some(order) = &order {
                self.seen.lock().unwrap().push(order.status);
            }
            Ok(order)
        }

        fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt> {
            self.inner.commit(changes)
        }

        fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
            self.inner.list_orders(filter, page)
        }

        fn list_assets(&self, filter: &AssetFilter, page: PageRequest) -> Result<Page<Asset>> {
            self.inner.list_assets(filter, page)
        }
    }

    /// A pending BUY of 2 x 10 with 80 usable and 20 reserved cash left.
    fn pending_buy(store: &Arc<MemoryStore>) -> (CustomerId, Order) {
        let customer = CustomerId::new();
        store.seed_asset(customer, &name("TRY"), dec(100), Decimal::ZERO);
        let service = OrderService::new(store.clone(), OrderServiceConfig::default()).unwrap();
        let order = service
            .create_order(OrderRequest::new(customer, "XYZ", OrderSide::Buy, dec(2), dec(10)))
            .unwrap();
        (customer, order)
    }

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn name(s: &str) -> AssetName {
        AssetName::parse(s).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, OrderService) {
        let store = Arc::new(MemoryStore::new());
        let service = OrderService::new(store.clone(), OrderServiceConfig::default()).unwrap();
        (store, service)
    }

    #[test]
    fn create_persists_pending_order() {
        let (store, service) = setup();
        let customer = CustomerId::new();
        store.seed_asset(customer, &name("TRY"), dec(100), Decimal::ZERO);

        let order = service
            .create_order(OrderRequest::new(customer, "XYZ", OrderSide::Buy, dec(2), dec(10)))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(service.get_order(order.id).unwrap(), order);
    }

    #[test]
    fn rejected_create_leaves_nothing_behind() {
        let (store, service) = setup();
        let customer = CustomerId::new();
        store.seed_asset(customer, &name("TRY"), dec(10), Decimal::ZERO);

        let err = service
            .create_order(OrderRequest::new(customer, "XYZ", OrderSide::Buy, dec(2), dec(10)))
            .unwrap_err();
        assert!(matches!(err, OmsError::InsufficientFunds { .. }));
        assert_eq!(store.order_count(), 0);
        let cash = store.load_asset(customer, &name("TRY")).unwrap().unwrap();
        assert_eq!(cash.usable, dec(10));
        assert_eq!(cash.version, 1);
    }

    #[test]
    fn invalid_request_is_validation_error() {
        let (_, service) = setup();
        let err = service
            .create_order(OrderRequest::new(CustomerId::new(), "x", OrderSide::Sell, dec(1), dec(1)))
            .unwrap_err();
        assert!(matches!(err, OmsError::Validation { .. }));
    }

    #[test]
    fn unknown_order_is_not_found() {
        let (_, service) = setup();
        let id = OrderId::new();
        assert!(matches!(service.cancel_order(id), Err(OmsError::OrderNotFound(_))));
        assert!(matches!(service.match_order(id), Err(OmsError::OrderNotFound(_))));
        assert!(matches!(service.get_order(id), Err(OmsError::OrderNotFound(_))));
    }

    #[test]
    fn matched_order_cannot_be_canceled() {
        let (store, service) = setup();
        let customer = CustomerId::new();
        store.seed_asset(customer, &name("XYZ"), dec(5), Decimal::ZERO);
        let order = service
            .create_order(OrderRequest::new(customer, "XYZ", OrderSide::Sell, dec(5), dec(3)))
            .unwrap();
        service.match_order(order.id).unwrap();

        let err = service.cancel_order(order.id).unwrap_err();
        assert!(matches!(
            err,
            OmsError::NotCancellable {
                status: OrderStatus::Matched,
                ..
            }
        ));
        let err = service.match_order(order.id).unwrap_err();
        assert!(matches!(err, OmsError::NotMatchable { .. }));
    }

    #[test]
    fn cancel_as_stranger_is_denied_and_changes_nothing() {
        let (store, service) = setup();
        let owner = CustomerId::new();
        store.seed_asset(owner, &name("TRY"), dec(100), Decimal::ZERO);
        let order = service
            .create_order(OrderRequest::new(owner, "XYZ", OrderSide::Buy, dec(1), dec(10)))
            .unwrap();

        let stranger = Principal::customer(CustomerId::new());
        let err = service.cancel_order_as(&stranger, order.id).unwrap_err();
        assert!(matches!(err, OmsError::AccessDenied { .. }));
        assert!(service.get_order(order.id).unwrap().is_pending());

        let admin = Principal::admin(CustomerId::new());
        let canceled = service.cancel_order_as(&admin, order.id).unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);
    }

    #[test]
    fn custom_guard_replaces_owner_check() {
        struct AdminsOnly;
        impl AccessGuard for AdminsOnly {
            fn can_access_customer(&self, principal: &Principal, _: CustomerId) -> bool {
                principal.is_admin()
            }
        }

        let (store, service) = setup();
        let service = service.with_guard(Arc::new(AdminsOnly));
        let owner = CustomerId::new();
        store.seed_asset(owner, &name("TRY"), dec(10), Decimal::ZERO);
        let order = service
            .create_order(OrderRequest::new(owner, "XYZ", OrderSide::Buy, dec(1), dec(10)))
            .unwrap();

        let err = service
            .cancel_order_as(&Principal::customer(owner), order.id)
            .unwrap_err();
        assert!(matches!(err, OmsError::AccessDenied { .. }));
    }

    #[test]
    fn match_landing_mid_cancel_is_retried_into_not_cancellable() {
        let inner = Arc::new(MemoryStore::new());
        let (customer, order) = pending_buy(&inner);

        let rival_store = inner.clone();
        let order_id = order.id;
        let store = Arc::new(InterleavingStore::new(inner.clone()).with_hook(move || {
            let rival = OrderService::new(rival_store, OrderServiceConfig::default()).unwrap();
            rival.match_order(order_id).unwrap();
        }));
        let config = OrderServiceConfig::default().with_max_retries(3);
        let service = OrderService::new(store.clone(), config).unwrap();

        let err = service.cancel_order(order.id).unwrap_err();
        assert!(
            matches!(
                err,
                OmsError::NotCancellable {
                    status: OrderStatus::Matched,
                    ..
                }
            ),
            "{err:?}"
        );
        // First attempt: read PENDING, re-read MATCHED after the shortfall.
        // Second attempt: read MATCHED and stop.
        assert_eq!(
            store.seen(),
            vec![OrderStatus::Pending, OrderStatus::Matched, OrderStatus::Matched]
        );
        let cash = inner.load_asset(customer, &name("TRY")).unwrap().unwrap();
        assert_eq!((cash.usable, cash.reserved), (dec(80), Decimal::ZERO));
        let units = inner.load_asset(customer, &name("XYZ")).unwrap().unwrap();
        assert_eq!(units.usable, dec(2));
    }

    #[test]
    fn shortfall_on_still_pending_order_is_not_retried() {
        let inner = Arc::new(MemoryStore::new());
        let (customer, order) = pending_buy(&inner);
        inner.seed_asset(customer, &name("TRY"), dec(95), dec(5));

        let store = Arc::new(InterleavingStore::new(inner.clone()));
        let config = OrderServiceConfig::default().with_max_retries(3);
        let service = OrderService::new(store.clone(), config).unwrap();

        let err = service.cancel_order(order.id).unwrap_err();
        assert!(matches!(err, OmsError::InconsistentReservation { .. }), "{err:?}");
        assert_eq!(err.class(), ErrorClass::Server);
        // One attempt: the read plus the status re-check, no second read.
        assert_eq!(store.seen(), vec![OrderStatus::Pending, OrderStatus::Pending]);
        assert!(service.get_order(order.id).unwrap().is_pending());
        let cash = inner.load_asset(customer, &name("TRY")).unwrap().unwrap();
        assert_eq!((cash.usable, cash.reserved), (dec(95), dec(5)));
    }

    #[test]
    fn cancel_with_missing_row_is_not_found() {
        let inner = Arc::new(MemoryStore::new());
        let customer = CustomerId::new();
        let order = Order::dummy(customer, OrderSide::Sell, dec(1), dec(1));
        let mut tx = Transaction::begin(inner.as_ref());
        tx.insert_order(order.clone());
        tx.commit().unwrap();
        let service = OrderService::new(inner.clone(), OrderServiceConfig::default()).unwrap();

        let err = service.cancel_order(order.id).unwrap_err();
        assert!(matches!(err, OmsError::AssetNotFound { .. }), "{err:?}");
        assert_eq!(err.class(), ErrorClass::NotFound);
        let err = service.match_order(order.id).unwrap_err();
        assert!(matches!(err, OmsError::AssetNotFound { .. }), "{err:?}");
        assert!(service.get_order(order.id).unwrap().is_pending());
        assert_eq!(inner.asset_count(), 0);
    }

    #[test]
    fn inverted_listing_window_rejected() {
        let (_, service) = setup();
        let now = chrono::Utc::now();
        let filter = OrderFilter::new(CustomerId::new(), now, now - chrono::Duration::days(1));
        let err = service.list_orders(&filter, PageRequest::new(0, 0)).unwrap_err();
        assert!(matches!(err, OmsError::Validation { field: "from", .. }));
    }

    #[test]
    fn bad_config_rejected() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let config = OrderServiceConfig {
            cash_asset: "t".into(),
            ..OrderServiceConfig::default()
        };
        assert!(matches!(
            OrderService::new(store, config),
            Err(OmsError::Configuration(_))
        ));
    }
}
