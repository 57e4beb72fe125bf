use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{CheckoutId, OrderId, SkuId};
use domain::Order;
use tokio::sync::RwLock;

use crate::error::ensure_positive;
use crate::{
    OrderRepository, RestoreOutcome, Result, StockLedger, StockRecord, StoreError, Version,
};

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    stock: HashMap<SkuId, StockRecord>,
    attempts: HashSet<CheckoutId>,
    compensations: HashSet<(CheckoutId, SkuId)>,
    contended: HashSet<SkuId>,
    failing_increments: HashSet<SkuId>,
    decrement_attempts: u64,
}

/// In-memory stock ledger for testing.
///
/// Decrements read and write in two separate critical sections, so
/// concurrent callers race exactly like they do against the database.
/// Test seams can force permanent contention on a SKU or make its
/// increments fail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryStockLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger seeded with the given counts, each at version 1.
    ///
    /// Seeding goes through [`StockLedger::put_stock`], so a negative
    /// count is rejected with [`StoreError::InvalidQuantity`].
    pub async fn with_stock<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<SkuId>,
    {
        let ledger = Self::new();
        for (sku, available) in entries {
            ledger.put_stock(&sku.into(), available).await?;
        }
        Ok(ledger)
    }

    /// Makes every conditional write on `sku` lose to a competing writer.
    pub async fn set_contended(&self, sku: impl Into<SkuId>, contended: bool) {
        let sku = sku.into();
        let mut state = self.state.write().await;
        if contended {
            state.contended.insert(sku);
        } else {
            state.contended.remove(&sku);
        }
    }

    /// Makes increments and restores of `sku` fail.
    pub async fn set_fail_on_increment(&self, sku: impl Into<SkuId>, fail: bool) {
        let sku = sku.into();
        let mut state = self.state.write().await;
        if fail {
            state.failing_increments.insert(sku);
        } else {
            state.failing_increments.remove(&sku);
        }
    }

    /// Total number of decrement attempts that reached the write phase.
    pub async fn decrement_attempts(&self) -> u64 {
        self.state.read().await.decrement_attempts
    }

    /// Units on hand for `sku`, or `None` if unknown.
    pub async fn available(&self, sku: impl Into<SkuId>) -> Option<i64> {
        let sku = sku.into();
        self.state.read().await.stock.get(&sku).map(|r| r.available)
    }

    fn apply_increment(
        state: &mut InMemoryLedgerState,
        sku: &SkuId,
        quantity: i64,
    ) -> Result<Version> {
        if state.failing_increments.contains(sku) {
            return Err(StoreError::Unavailable(format!("increment of {sku} rejected")));
        }
        let record = state
            .stock
            .get_mut(sku)
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;
        record.available += quantity;
        record.version = record.version.next();
        Ok(record.version)
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn begin_attempt(&self, checkout_id: CheckoutId) -> Result<()> {
        if !self.state.write().await.attempts.insert(checkout_id) {
            return Err(StoreError::AttemptReused(checkout_id));
        }
        Ok(())
    }

    async fn decrement(&self, sku: &SkuId, quantity: i64) -> Result<Version> {
        ensure_positive(sku, quantity)?;

        let observed = self
            .get_stock(sku)
            .await?
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;

        if observed.available < quantity {
            return Err(StoreError::InsufficientStock {
                sku: sku.clone(),
                available: observed.available,
                requested: quantity,
            });
        }

        // Other writers may run between the read above and the write below.
        tokio::task::yield_now().await;

        let mut state = self.state.write().await;
        state.decrement_attempts += 1;
        let contended = state.contended.contains(sku);

        let record = state
            .stock
            .get_mut(sku)
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;

        if contended {
            record.version = record.version.next();
        }

        if record.version != observed.version {
            return Err(StoreError::VersionConflict {
                sku: sku.clone(),
                expected: observed.version,
                actual: record.version,
            });
        }

        record.available -= quantity;
        record.version = record.version.next();
        Ok(record.version)
    }

    async fn increment(&self, sku: &SkuId, quantity: i64) -> Result<Version> {
        ensure_positive(sku, quantity)?;
        let mut state = self.state.write().await;
        Self::apply_increment(&mut state, sku, quantity)
    }

    async fn restore(
        &self,
        checkout_id: CheckoutId,
        sku: &SkuId,
        quantity: i64,
    ) -> Result<RestoreOutcome> {
        ensure_positive(sku, quantity)?;
        let mut state = self.state.write().await;

        let key = (checkout_id, sku.clone());
        if state.compensations.contains(&key) {
            return Ok(RestoreOutcome::AlreadyApplied);
        }

        let version = Self::apply_increment(&mut state, sku, quantity)?;
        state.compensations.insert(key);
        Ok(RestoreOutcome::Applied(version))
    }

    async fn get_stock(&self, sku: &SkuId) -> Result<Option<StockRecord>> {
        Ok(self.state.read().await.stock.get(sku).cloned())
    }

    async fn put_stock(&self, sku: &SkuId, available: i64) -> Result<Version> {
        if available < 0 {
            return Err(StoreError::InvalidQuantity {
                sku: sku.clone(),
                quantity: available,
            });
        }

        let mut state = self.state.write().await;
        let record = state
            .stock
            .entry(sku.clone())
            .and_modify(|r| {
                r.available = available;
                r.version = r.version.next();
            })
            .or_insert_with(|| StockRecord {
                sku_id: sku.clone(),
                available,
                version: Version::first(),
            });
        Ok(record.version)
    }
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_insert: bool,
}

/// In-memory order repository for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the repository to reject inserts.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().await.fail_on_insert = fail;
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_insert {
            return Err(StoreError::Unavailable("order insert rejected".to_string()));
        }
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::Unavailable(format!(
                "order {} already exists",
                order.id
            )));
        }

        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.state.read().await.orders.len() as u64)
    }
}
