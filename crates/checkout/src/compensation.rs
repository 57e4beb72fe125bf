//! Best-effort restoration of stock deducted by a failed checkout.

use common::{CheckoutId, SkuId};
use domain::DeductionRequest;
use inventory_store::{RestoreOutcome, StockLedger};

use crate::error::CompensationFailure;

/// Puts back stock for items a failed checkout already deducted.
///
/// Each item is restored independently: a failure on one item does not stop
/// the others. Failures are logged and returned, never raised. Restores go
/// through the ledger's compensation record, so the ledger adds each SKU
/// back at most once per checkout. The items handed in are always freshly
/// deducted, so a restore the ledger already holds means those units stay
/// deducted; it is reported as a failure for reconciliation.
#[derive(Debug, Clone)]
pub struct CompensationCoordinator<L> {
    ledger: L,
}

impl<L: StockLedger> CompensationCoordinator<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Restores every deducted item, most recent first.
    ///
    /// Lines for the same SKU are merged into one restore, since the
    /// compensation record is keyed by `(checkout, sku)`.
    #[tracing::instrument(skip(self, deducted), fields(items = deducted.len()))]
    pub async fn restore(
        &self,
        checkout_id: CheckoutId,
        deducted: &[DeductionRequest],
    ) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        for (sku, quantity) in coalesce(deducted).into_iter().rev() {
            let outcome = self.ledger.restore(checkout_id, &sku, quantity).await;
            match outcome {
                Ok(RestoreOutcome::Applied(version)) => {
                    metrics::counter!("stock_compensations_total").increment(1);
                    tracing::info!(%checkout_id, %sku, quantity, %version, "stock restored");
                }
                Ok(RestoreOutcome::AlreadyApplied) => {
                    metrics::counter!("stock_compensation_failures_total").increment(1);
                    tracing::warn!(
                        %checkout_id,
                        %sku,
                        quantity,
                        "checkout already restored this sku; deducted units left in place"
                    );
                    failures.push(CompensationFailure::AlreadyRestored {
                        checkout_id,
                        sku,
                        quantity,
                    });
                }
                Err(source) => {
                    metrics::counter!("stock_compensation_failures_total").increment(1);
                    tracing::warn!(
                        %checkout_id,
                        %sku,
                        quantity,
                        error = %source,
                        "stock restore failed; inventory needs reconciliation"
                    );
                    failures.push(CompensationFailure::Restore {
                        sku,
                        quantity,
                        source,
                    });
                }
            }
        }

        failures
    }
}

/// Sums quantities per SKU, keeping first-seen order.
fn coalesce(deducted: &[DeductionRequest]) -> Vec<(SkuId, i64)> {
    let mut merged: Vec<(SkuId, i64)> = Vec::with_capacity(deducted.len());
    for request in deducted {
        match merged.iter_mut().find(|(sku, _)| *sku == request.sku_id) {
            Some((_, quantity)) => *quantity += request.quantity,
            None => merged.push((request.sku_id.clone(), request.quantity)),
        }
    }
    merged
}
