//! Cart snapshots and the deduction requests derived from them.

use std::collections::{HashMap, HashSet};

use common::{Money, SkuId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One stock decrement: take `quantity` units of `sku_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeductionRequest {
    pub sku_id: SkuId,
    pub quantity: i64,
}

impl DeductionRequest {
    /// Creates a new deduction request.
    pub fn new(sku_id: impl Into<SkuId>, quantity: i64) -> Self {
        Self {
            sku_id: sku_id.into(),
            quantity,
        }
    }

    /// Rejects requests that cannot represent a real purchase line.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity <= 0 {
            return Err(DomainError::InvalidQuantity {
                sku: self.sku_id.clone(),
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

/// A priced line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub sku_id: SkuId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl CartLine {
    pub fn new(sku_id: impl Into<SkuId>, quantity: i64, unit_price: Money) -> Self {
        Self {
            sku_id: sku_id.into(),
            quantity,
            unit_price,
        }
    }
}

/// Read-only view of a validated cart, as supplied by the catalog service.
///
/// Line order is preserved: it is the order in which stock is deducted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn new(user_id: UserId, lines: Vec<CartLine>) -> Self {
        Self { user_id, lines }
    }

    /// Checks that the cart is non-empty, every line is positive and
    /// priced, and no SKU appears twice.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let mut seen = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            if line.quantity <= 0 {
                return Err(DomainError::InvalidQuantity {
                    sku: line.sku_id.clone(),
                    quantity: line.quantity,
                });
            }
            if line.unit_price.is_negative() {
                return Err(DomainError::InvalidPrice {
                    sku: line.sku_id.clone(),
                    cents: line.unit_price.cents(),
                });
            }
            if !seen.insert(&line.sku_id) {
                return Err(DomainError::DuplicateSku(line.sku_id.clone()));
            }
        }
        self.total()?;
        Ok(())
    }

    /// Sum of all line totals, checked for overflow.
    pub fn total(&self) -> Result<Money, DomainError> {
        let mut total = Money::zero();
        for line in &self.lines {
            total = line
                .unit_price
                .checked_mul(line.quantity)
                .and_then(|amount| total.checked_add(amount))
                .ok_or_else(|| {
                    DomainError::AmountOverflow(format!("cart total at line {}", line.sku_id))
                })?;
        }
        Ok(total)
    }

    /// Deduction requests in cart order.
    pub fn deduction_requests(&self) -> Vec<DeductionRequest> {
        self.lines
            .iter()
            .map(|line| DeductionRequest::new(line.sku_id.clone(), line.quantity))
            .collect()
    }

    /// Unit prices keyed by SKU.
    pub fn unit_prices(&self) -> UnitPrices {
        UnitPrices(
            self.lines
                .iter()
                .map(|line| (line.sku_id.clone(), line.unit_price))
                .collect(),
        )
    }
}

/// Price lookup used when turning deducted requests into order items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitPrices(HashMap<SkuId, Money>);

impl UnitPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sku_id: impl Into<SkuId>, price: Money) {
        self.0.insert(sku_id.into(), price);
    }

    pub fn get(&self, sku_id: &SkuId) -> Option<Money> {
        self.0.get(sku_id).copied()
    }
}

impl FromIterator<(SkuId, Money)> for UnitPrices {
    fn from_iter<T: IntoIterator<Item = (SkuId, Money)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
