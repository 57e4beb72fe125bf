//! Shared identifiers and value types for the inventory checkout engine.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CheckoutId, OrderId, SkuId, UserId};
