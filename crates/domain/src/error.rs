//! Domain error types.

use common::{CheckoutId, SkuId};
use thiserror::Error;

/// Errors raised while validating carts, requests and orders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A purchase line must move at least one unit.
    #[error("Invalid quantity for {sku}: {quantity} (must be greater than 0)")]
    InvalidQuantity { sku: SkuId, quantity: i64 },

    /// Unit prices cannot be negative.
    #[error("Invalid price for {sku}: {cents} cents")]
    InvalidPrice { sku: SkuId, cents: i64 },

    /// A line or order total does not fit in the money range.
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// The checkout id was already used by an earlier attempt.
    #[error("Checkout {0} was already attempted")]
    CheckoutReused(CheckoutId),

    /// The cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The same SKU appears on more than one cart line.
    #[error("Duplicate cart line for {0}")]
    DuplicateSku(SkuId),

    /// No unit price is known for a deducted SKU.
    #[error("No unit price for {0}")]
    MissingPrice(SkuId),

    /// An order must contain at least one item.
    #[error("Order has no items")]
    NoItems,

    /// A persisted status string is not recognised.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
