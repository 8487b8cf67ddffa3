//! System-wide constants for the order management engine.

/// Decimal places kept on every asset balance (size / usable / reserved).
pub const ASSET_SCALE: u32 = 6;

/// Maximum decimal places accepted for an order size (share quantity).
pub const SIZE_SCALE: u32 = 6;

/// Maximum decimal places accepted for an order price.
pub const PRICE_SCALE: u32 = 4;

/// Minimum length of an asset name.
pub const ASSET_NAME_MIN_LEN: usize = 2;

/// Maximum length of an asset name.
pub const ASSET_NAME_MAX_LEN: usize = 16;

/// The quote / cash asset every order is priced in.
pub const DEFAULT_CASH_ASSET: &str = "TRY";

/// Default bound on optimistic-lock retries per order transition.
pub const DEFAULT_OPTIMISTIC_LOCK_MAX_RETRIES: u32 = 3;

/// Default page size for order and asset listings.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound on a requested page size.
pub const MAX_PAGE_SIZE: usize = 100;
