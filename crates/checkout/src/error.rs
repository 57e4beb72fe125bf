//! Checkout error types.

use common::{CheckoutId, SkuId};
use domain::DomainError;
use inventory_store::StoreError;
use thiserror::Error;

/// Why a checkout attempt ended in `Failed`.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed input, rejected before any stock was touched.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// Not enough units on hand. Not retried.
    #[error("Insufficient stock for {sku}: {available} available, {requested} requested")]
    StockInsufficient {
        sku: SkuId,
        available: i64,
        requested: i64,
    },

    /// Every attempt lost the optimistic race.
    #[error("Gave up deducting {sku} after {attempts} conflicting attempts")]
    DeductionExhausted { sku: SkuId, attempts: u32 },

    /// The order or one of its items could not be persisted.
    #[error("Order creation failed: {0}")]
    OrderCreation(String),

    /// The ledger failed for a reason other than stock or contention.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl CheckoutError {
    /// True when the user should be told to adjust their cart.
    ///
    /// Insufficient stock and exhausted retries read the same to the user;
    /// they differ only for diagnostics.
    pub fn is_user_adjustable(&self) -> bool {
        matches!(
            self,
            CheckoutError::StockInsufficient { .. } | CheckoutError::DeductionExhausted { .. }
        )
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::InvalidRequest(_) => "invalid_request",
            CheckoutError::StockInsufficient { .. } => "insufficient_stock",
            CheckoutError::DeductionExhausted { .. } => "retries_exhausted",
            CheckoutError::OrderCreation(_) => "order_creation",
            CheckoutError::Storage(_) => "storage",
        }
    }
}

/// A deducted item whose stock was not put back.
///
/// Collected and logged, never returned as the checkout's own error.
#[derive(Debug, Error)]
pub enum CompensationFailure {
    /// The ledger rejected the restore.
    #[error("Failed to restore {quantity} x {sku}: {source}")]
    Restore {
        sku: SkuId,
        quantity: i64,
        #[source]
        source: StoreError,
    },

    /// The ledger already holds a restore for this checkout and SKU, so the
    /// units just deducted under the same id stay deducted.
    #[error("{quantity} x {sku} not restored: checkout {checkout_id} already restored this SKU")]
    AlreadyRestored {
        checkout_id: CheckoutId,
        sku: SkuId,
        quantity: i64,
    },
}

impl CompensationFailure {
    pub fn sku(&self) -> &SkuId {
        match self {
            CompensationFailure::Restore { sku, .. }
            | CompensationFailure::AlreadyRestored { sku, .. } => sku,
        }
    }

    pub fn quantity(&self) -> i64 {
        match self {
            CompensationFailure::Restore { quantity, .. }
            | CompensationFailure::AlreadyRestored { quantity, .. } => *quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_adjustable_errors() {
        let insufficient = CheckoutError::StockInsufficient {
            sku: SkuId::new("SKU-1"),
            available: 1,
            requested: 2,
        };
        let exhausted = CheckoutError::DeductionExhausted {
            sku: SkuId::new("SKU-1"),
            attempts: 4,
        };
        let creation = CheckoutError::OrderCreation("disk full".to_string());

        assert!(insufficient.is_user_adjustable());
        assert!(exhausted.is_user_adjustable());
        assert!(!creation.is_user_adjustable());
        assert!(!CheckoutError::from(DomainError::EmptyCart).is_user_adjustable());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            CheckoutError::from(DomainError::EmptyCart).kind(),
            "invalid_request"
        );
        assert_eq!(
            CheckoutError::from(StoreError::SkuNotFound(SkuId::new("X"))).kind(),
            "storage"
        );
    }
}
