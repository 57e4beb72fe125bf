use async_trait::async_trait;
use common::OrderId;
use domain::Order;

use crate::Result;

/// Persistence for created orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order and all of its items in one short transaction.
    ///
    /// Either the order and every item are stored, or nothing is.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads an order with its items in line order.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Number of stored orders.
    async fn count(&self) -> Result<u64>;
}
