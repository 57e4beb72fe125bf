//! Domain layer for the inventory checkout engine.
//!
//! This crate provides the value types the checkout flow passes around:
//! - `DeductionRequest`, one `(sku, quantity)` stock decrement
//! - `CartSnapshot`, the validated cart handed over by the catalog service
//! - `Order` and `OrderItem`, created once every deduction succeeded

pub mod cart;
pub mod error;
pub mod order;

pub use cart::{CartLine, CartSnapshot, DeductionRequest, UnitPrices};
pub use common::{CheckoutId, Money, OrderId, SkuId, UserId};
pub use error::DomainError;
pub use order::{Order, OrderItem, OrderStatus, ShippingInfo};
