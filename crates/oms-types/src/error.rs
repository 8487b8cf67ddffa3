//! Error types for the order management engine.
//!
//! All errors use the `OMS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation / lookup errors
//! - 2xx: Balance errors
//! - 3xx: Order lifecycle errors
//! - 4xx: Concurrency errors
//! - 5xx: Access errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{CustomerId, OrderId, OrderStatus};

/// Central error enum for all OMS operations.
#[derive(Debug, Error)]
pub enum OmsError {
    // =================================================================
    // Validation / Lookup Errors (1xx)
    // =================================================================
    /// Malformed input: bad asset name, non-positive amount, excess scale.
    #[error("OMS_ERR_100: Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The requested order does not exist.
    #[error("OMS_ERR_101: Order {0} not found")]
    OrderNotFound(OrderId),

    /// No asset row exists for this customer + asset.
    #[error("OMS_ERR_102: {asset} asset not found for customer {customer_id}")]
    AssetNotFound {
        customer_id: CustomerId,
        asset: String,
    },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Usable balance too low to place the order.
    #[error("OMS_ERR_200: Insufficient {asset} usable balance: need {needed}, have {available}")]
    InsufficientFunds {
        asset: String,
        needed: Decimal,
        available: Decimal,
    },

    /// Reserved balance lower than the amount an order claims to hold.
    /// The ledger and the order book disagree; this is a bug, not a user error.
    #[error("OMS_ERR_201: Inconsistent {asset} reserved balance: need {needed}, reserved {reserved}")]
    InconsistentReservation {
        asset: String,
        needed: Decimal,
        reserved: Decimal,
    },

    /// A write would leave usable or reserved below zero.
    #[error("OMS_ERR_202: Negative {asset} balance rejected")]
    NegativeBalance { asset: String },

    // =================================================================
    // Order Lifecycle Errors (3xx)
    // =================================================================
    /// Only PENDING orders can be canceled.
    #[error("OMS_ERR_300: Order {order_id} cannot be canceled in status {status}")]
    NotCancellable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// Only PENDING orders can be matched.
    #[error("OMS_ERR_301: Order {order_id} cannot be matched in status {status}")]
    NotMatchable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// An order with this ID already exists.
    #[error("OMS_ERR_302: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    // =================================================================
    // Concurrency Errors (4xx)
    // =================================================================
    /// Optimistic version check failed: the row changed since it was read.
    #[error("OMS_ERR_400: Concurrent update on {entity}, please retry")]
    ConcurrentUpdate { entity: String },

    // =================================================================
    // Access Errors (5xx)
    // =================================================================
    /// The caller is neither the owning customer nor an admin.
    #[error("OMS_ERR_500: Access denied: {reason}")]
    AccessDenied { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OMS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config, out-of-range values).
    #[error("OMS_ERR_901: Configuration error: {0}")]
    Configuration(String),
}

/// How a caller-facing layer should surface an [`OmsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input or a business rule rejected the request (400).
    Client,
    /// The referenced entity does not exist (404).
    NotFound,
    /// The entity is in the wrong state for the request (409).
    Conflict,
    /// Lost an optimistic race after all retries; the caller may retry (409).
    RetryableConflict,
    /// The caller is not allowed to act on this customer (403).
    Forbidden,
    /// An invariant was broken inside the engine (500).
    Server,
}

impl OmsError {
    /// Shorthand for a [`OmsError::Validation`].
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`OmsError::ConcurrentUpdate`].
    pub fn concurrent_update(entity: impl Into<String>) -> Self {
        Self::ConcurrentUpdate {
            entity: entity.into(),
        }
    }

    /// Only optimistic-concurrency conflicts are worth re-running.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentUpdate { .. })
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } | Self::InsufficientFunds { .. } => ErrorClass::Client,
            Self::OrderNotFound(_) | Self::AssetNotFound { .. } => ErrorClass::NotFound,
            Self::NotCancellable { .. } | Self::NotMatchable { .. } | Self::DuplicateOrder(_) => {
                ErrorClass::Conflict
            }
            Self::ConcurrentUpdate { .. } => ErrorClass::RetryableConflict,
            Self::AccessDenied { .. } => ErrorClass::Forbidden,
            Self::InconsistentReservation { .. }
            | Self::NegativeBalance { .. }
            | Self::Internal(_)
            | Self::Configuration(_) => ErrorClass::Server,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OmsError>;
