use common::{CheckoutId, SkuId};
use domain::DomainError;
use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the stock ledger or the
/// order repository.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Not enough units on hand to satisfy a decrement.
    #[error("Insufficient stock for {sku}: {available} available, {requested} requested")]
    InsufficientStock {
        sku: SkuId,
        available: i64,
        requested: i64,
    },

    /// Another writer changed the record between read and conditional write.
    #[error("Version conflict for {sku}: expected version {expected}, found {actual}")]
    VersionConflict {
        sku: SkuId,
        expected: Version,
        actual: Version,
    },

    /// No stock record exists for the SKU.
    #[error("SKU not found: {0}")]
    SkuNotFound(SkuId),

    /// Ledger mutations must move at least one unit.
    #[error("Invalid quantity for {sku}: {quantity}")]
    InvalidQuantity { sku: SkuId, quantity: i64 },

    /// The governor refused a configuration.
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// The backing store rejected the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The order failed its own invariants and was not written.
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] DomainError),

    /// The checkout id was already claimed by an earlier attempt.
    #[error("Checkout attempt {0} already started")]
    AttemptReused(CheckoutId),

    /// A persisted row could not be decoded.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// True when retrying the same operation may succeed.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

pub(crate) fn ensure_positive(sku: &SkuId, quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(StoreError::InvalidQuantity {
            sku: sku.clone(),
            quantity,
        });
    }
    Ok(())
}
