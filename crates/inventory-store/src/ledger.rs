use async_trait::async_trait;
use common::{CheckoutId, SkuId};

use crate::{RestoreOutcome, Result, StockRecord, Version};

/// Per-SKU stock counters with optimistic version stamps.
///
/// The ledger is the only writer of stock records. All implementations must
/// be thread-safe (Send + Sync) and keep `available >= 0` at all times.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Claims `checkout_id` for one checkout attempt.
    ///
    /// Fails with `AttemptReused` if the id was claimed before. Restores are
    /// recorded per `(checkout, sku)`, so an id that deducts stock twice
    /// could only ever put it back once.
    async fn begin_attempt(&self, checkout_id: CheckoutId) -> Result<()>;

    /// Takes `quantity` units of `sku`.
    ///
    /// Reads the record, fails with `InsufficientStock` if fewer than
    /// `quantity` units are on hand, and otherwise writes the new count only
    /// if the version is still the one it read. Losing that race yields
    /// `VersionConflict`, never `InsufficientStock`.
    ///
    /// Returns the version written.
    async fn decrement(&self, sku: &SkuId, quantity: i64) -> Result<Version>;

    /// Puts `quantity` units of `sku` back and bumps the version.
    ///
    /// No business precondition and no deduplication: calling it twice adds
    /// the stock twice.
    async fn increment(&self, sku: &SkuId, quantity: i64) -> Result<Version>;

    /// Compensating increment, applied at most once per `(checkout, sku)`.
    ///
    /// The restore is recorded in the compensation ledger in the same
    /// transaction as the increment, so a repeated call reports
    /// `AlreadyApplied` and leaves stock untouched.
    async fn restore(
        &self,
        checkout_id: CheckoutId,
        sku: &SkuId,
        quantity: i64,
    ) -> Result<RestoreOutcome>;

    /// Reads the current record for `sku`, if any.
    async fn get_stock(&self, sku: &SkuId) -> Result<Option<StockRecord>>;

    /// Sets the on-hand count of `sku`, creating the record if needed.
    ///
    /// Administrative: used for seeding and replenishment, bumps the
    /// version like any other mutation.
    async fn put_stock(&self, sku: &SkuId, available: i64) -> Result<Version>;
}
