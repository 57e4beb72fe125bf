//! Orders created after a fully deducted checkout.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, SkuId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lifecycle status of a persisted order.
///
/// The checkout engine only ever produces `Created`; later statuses belong
/// to payment and fulfilment, which live elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Created,
}

impl OrderStatus {
    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(OrderStatus::Created),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Where the order ships to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

impl ShippingInfo {
    pub fn new(
        recipient: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            address: address.into(),
            city: city.into(),
            postal_code: postal_code.into(),
        }
    }
}

/// An item in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku_id: SkuId,
    pub quantity: i64,
    /// Price per unit in cents.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(sku_id: impl Into<SkuId>, quantity: i64, unit_price: Money) -> Self {
        Self {
            sku_id: sku_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns quantity * unit_price, or `None` on overflow.
    pub fn total_price(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// A created order together with all of its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingInfo,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new order in `Created` status.
    ///
    /// Fails if there are no items, any item has a non-positive quantity, or
    /// the total does not fit in the money range.
    pub fn create(
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping: ShippingInfo,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::NoItems);
        }
        if let Some(bad) = items.iter().find(|item| item.quantity <= 0) {
            return Err(DomainError::InvalidQuantity {
                sku: bad.sku_id.clone(),
                quantity: bad.quantity,
            });
        }

        let order = Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Created,
            items,
            shipping,
            created_at: Utc::now(),
        };
        order.total_amount()?;
        Ok(order)
    }

    /// Sum of all line totals, checked for overflow.
    pub fn total_amount(&self) -> Result<Money, DomainError> {
        self.items
            .iter()
            .map(OrderItem::total_price)
            .collect::<Option<Vec<_>>>()
            .and_then(Money::checked_sum)
            .ok_or_else(|| DomainError::AmountOverflow(format!("total of order {}", self.id)))
    }
}
