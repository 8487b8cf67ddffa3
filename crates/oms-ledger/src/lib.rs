//! # oms-ledger
//!
//! **Balance Ledger**: versioned asset rows, transactional commits and the
//! optimistic-concurrency retry loop.
//!
//! ## Architecture
//!
//! 1. **Store**: the persistence seam. Row fetch, atomic versioned commit,
//!    filtered listings. [`MemoryStore`] is the in-process implementation.
//! 2. **Transaction**: stages asset and order writes for one unit of work
//!    and commits them together or not at all
//! 3. **BalanceLedger**: `get` / `get_or_create` / `upsert` on asset rows
//!    inside a transaction; re-derives `size` and checks versions
//! 4. **ConflictRetry**: re-runs a unit of work after a
//!    `ConcurrentUpdate`, up to a configured bound
//!
//! ## Write Flow
//!
//! ```text
//! ConflictRetry.run(|| {
//!     Transaction.begin() → BalanceLedger.get() → mutate → BalanceLedger.upsert()
//!         → Transaction.commit()
//! })
//! ```

pub mod ledger;
pub mod memory;
pub mod retry;
pub mod store;
pub mod transaction;

pub use ledger::BalanceLedger;
pub use memory::MemoryStore;
pub use retry::ConflictRetry;
pub use store::{AssetFilter, ChangeSet, CommitReceipt, OrderFilter, OrderWrite, Page, PageRequest, Store};
pub use transaction::Transaction;
