use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CheckoutId, Money, OrderId, SkuId, UserId};
use domain::{Order, OrderItem, OrderStatus, ShippingInfo};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::ensure_positive;
use crate::{
    OrderRepository, RestoreOutcome, Result, StockLedger, StockRecord, StoreError, Version,
};

/// SQLite-backed stock ledger.
#[derive(Clone)]
pub struct SqliteStockLedger {
    pool: SqlitePool,
}

impl SqliteStockLedger {
    /// Creates a ledger on a governed pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_record(row: SqliteRow) -> Result<StockRecord> {
        Ok(StockRecord {
            sku_id: SkuId::new(row.try_get::<String, _>("sku_id")?),
            available: row.try_get("available")?,
            version: Version::new(row.try_get("version")?),
        })
    }
}

#[async_trait]
impl StockLedger for SqliteStockLedger {
    async fn begin_attempt(&self, checkout_id: CheckoutId) -> Result<()> {
        let claimed = sqlx::query(
            r#"
            INSERT INTO checkout_attempts (checkout_id, started_at)
            VALUES (?1, ?2)
            ON CONFLICT (checkout_id) DO NOTHING
            "#,
        )
        .bind(checkout_id.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if claimed.rows_affected() == 0 {
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

        // Conditional write: only lands if nobody touched the row since the read.
        let result = sqlx::query(
            r#"
            UPDATE stock
            SET available = available - ?1, version = version + 1
            WHERE sku_id = ?2 AND version = ?3 AND available >= ?1
            "#,
        )
        .bind(quantity)
        .bind(sku.as_str())
        .bind(observed.version.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let actual = self
                .get_stock(sku)
                .await?
                .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;
            return Err(StoreError::VersionConflict {
                sku: sku.clone(),
                expected: observed.version,
                actual: actual.version,
            });
        }

        Ok(observed.version.next())
    }

    async fn increment(&self, sku: &SkuId, quantity: i64) -> Result<Version> {
        ensure_positive(sku, quantity)?;

        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock
            SET available = available + ?1, version = version + 1
            WHERE sku_id = ?2
            RETURNING version
            "#,
        )
        .bind(quantity)
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await?;

        version
            .map(Version::new)
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))
    }

    async fn restore(
        &self,
        checkout_id: CheckoutId,
        sku: &SkuId,
        quantity: i64,
    ) -> Result<RestoreOutcome> {
        ensure_positive(sku, quantity)?;

        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query(
            r#"
            INSERT INTO stock_compensations (checkout_id, sku_id, quantity, restored_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (checkout_id, sku_id) DO NOTHING
            "#,
        )
        .bind(checkout_id.to_string())
        .bind(sku.as_str())
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if recorded.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RestoreOutcome::AlreadyApplied);
        }

        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock
            SET available = available + ?1, version = version + 1
            WHERE sku_id = ?2
            RETURNING version
            "#,
        )
        .bind(quantity)
        .bind(sku.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(version) = version else {
            tx.rollback().await?;
            return Err(StoreError::SkuNotFound(sku.clone()));
        };

        tx.commit().await?;
        Ok(RestoreOutcome::Applied(Version::new(version)))
    }

    async fn get_stock(&self, sku: &SkuId) -> Result<Option<StockRecord>> {
        let row = sqlx::query("SELECT sku_id, available, version FROM stock WHERE sku_id = ?1")
            .bind(sku.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn put_stock(&self, sku: &SkuId, available: i64) -> Result<Version> {
        if available < 0 {
            return Err(StoreError::InvalidQuantity {
                sku: sku.clone(),
                quantity: available,
            });
        }

        let version: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock (sku_id, available, version)
            VALUES (?1, ?2, 1)
            ON CONFLICT (sku_id) DO UPDATE SET
                available = excluded.available,
                version = stock.version + 1
            RETURNING version
            "#,
        )
        .bind(sku.as_str())
        .bind(available)
        .fetch_one(&self.pool)
        .await?;

        Ok(Version::new(version))
    }
}

/// SQLite-backed order repository.
#[derive(Clone)]
pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: &SqliteRow, items: Vec<OrderItem>) -> Result<Order> {
        let id: String = row.try_get("id")?;
        let user_id: String = row.try_get("user_id")?;
        let status: String = row.try_get("status")?;

        Ok(Order {
            id: OrderId::parse(&id).map_err(|e| StoreError::Corrupt(format!("order id {id}: {e}")))?,
            user_id: UserId::parse(&user_id)
                .map_err(|e| StoreError::Corrupt(format!("user id {user_id}: {e}")))?,
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            items,
            shipping: ShippingInfo {
                recipient: row.try_get("recipient")?,
                address: row.try_get("address")?,
                city: row.try_get("city")?,
                postal_code: row.try_get("postal_code")?,
            },
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_item(row: SqliteRow) -> Result<OrderItem> {
        Ok(OrderItem {
            sku_id: SkuId::new(row.try_get::<String, _>("sku_id")?),
            quantity: row.try_get("quantity")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        let total = order.total_amount()?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, recipient, address, city, postal_code, total_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(order.id.to_string())
        .bind(order.user_id.to_string())
        .bind(order.status.as_str())
        .bind(order.shipping.recipient.as_str())
        .bind(order.shipping.address.as_str())
        .bind(order.shipping.city.as_str())
        .bind(order.shipping.postal_code.as_str())
        .bind(total.cents())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (line_no, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, sku_id, quantity, unit_price_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(order.id.to_string())
            .bind(line_no as i64)
            .bind(item.sku_id.as_str())
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let id = order_id.to_string();

        let Some(row) = sqlx::query(
            r#"
            SELECT id, user_id, status, recipient, address, city, postal_code, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query(
            r#"
            SELECT sku_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY line_no ASC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_item)
        .collect::<Result<Vec<_>>>()?;

        Self::row_to_order(&row, items).map(Some)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
