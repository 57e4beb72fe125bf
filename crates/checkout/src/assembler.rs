//! Turns a fully deducted cart into a persisted order.

use common::UserId;
use domain::{DeductionRequest, DomainError, Order, OrderItem, ShippingInfo, UnitPrices};
use inventory_store::OrderRepository;

use crate::error::CheckoutError;

/// Creates the order and its items in one short transaction of its own.
///
/// The assembler never touches stock and never compensates; whoever ran the
/// deduction decides what to put back when this fails.
#[derive(Debug, Clone)]
pub struct OrderAssembler<R> {
    orders: R,
}

impl<R: OrderRepository> OrderAssembler<R> {
    pub fn new(orders: R) -> Self {
        Self { orders }
    }

    pub fn repository(&self) -> &R {
        &self.orders
    }

    /// Builds one order item per deducted request and persists the order.
    ///
    /// Any failure, from a missing price to a storage error, is reported as
    /// [`CheckoutError::OrderCreation`] and nothing is stored.
    #[tracing::instrument(skip(self, deducted, prices, shipping), fields(items = deducted.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        deducted: &[DeductionRequest],
        prices: &UnitPrices,
        shipping: ShippingInfo,
    ) -> Result<Order, CheckoutError> {
        let items = deducted
            .iter()
            .map(|request| {
                prices
                    .get(&request.sku_id)
                    .map(|price| OrderItem::new(request.sku_id.clone(), request.quantity, price))
                    .ok_or_else(|| DomainError::MissingPrice(request.sku_id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CheckoutError::OrderCreation(e.to_string()))?;

        let order = Order::create(user_id, items, shipping)
            .map_err(|e| CheckoutError::OrderCreation(e.to_string()))?;

        self.orders
            .insert(&order)
            .await
            .map_err(|e| CheckoutError::OrderCreation(e.to_string()))?;

        tracing::info!(order_id = %order.id, items = order.items.len(), "order persisted");
        Ok(order)
    }
}
