//! Owner-or-admin access checks.

use oms_types::{CustomerId, OmsError, Result};

/// What the caller is allowed to act as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Customer,
    Admin,
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub customer_id: CustomerId,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            role: Role::Customer,
        }
    }

    #[must_use]
    pub fn admin(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            role: Role::Admin,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Decides whether a principal may act on a customer's orders and assets.
pub trait AccessGuard: Send + Sync {
    fn can_access_customer(&self, principal: &Principal, customer_id: CustomerId) -> bool;

    /// # Errors
    /// `AccessDenied` if [`AccessGuard::can_access_customer`] says no.
    fn check_customer_access(&self, principal: &Principal, customer_id: CustomerId) -> Result<()> {
        if self.can_access_customer(principal, customer_id) {
            return Ok(());
        }
        tracing::warn!(
            principal = %principal.customer_id,
            customer = %customer_id,
            "Access denied"
        );
        Err(OmsError::AccessDenied {
            reason: format!("customer {} may not act for {customer_id}", principal.customer_id),
        })
    }
}

/// Admins pass; everyone else only for their own customer id.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerOrAdmin;

impl AccessGuard for OwnerOrAdmin {
    fn can_access_customer(&self, principal: &Principal, customer_id: CustomerId) -> bool {
        principal.is_admin() || principal.customer_id == customer_id
    }
}
