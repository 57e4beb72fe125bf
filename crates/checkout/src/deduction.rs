//! Sequential, optimistically locked stock deduction for a whole cart.

use std::time::Duration;

use common::CheckoutId;
use domain::DeductionRequest;
use inventory_store::{StockLedger, StoreError};

use crate::compensation::CompensationCoordinator;
use crate::error::CheckoutError;
use crate::outcome::{DeductionFailure, DeductionOutcome, DeductionReport};
use crate::policy::RetryPolicy;

/// Deducts stock for each request in order, compensating on failure.
///
/// Requests are processed strictly one after another, so at the moment of a
/// failure the set of deducted items is an exact prefix of the input.
pub struct DeductionCoordinator<L> {
    ledger: L,
    compensation: CompensationCoordinator<L>,
    retry_delay: Duration,
}

impl<L> DeductionCoordinator<L>
where
    L: StockLedger + Clone,
{
    /// Creates a coordinator that sleeps `retry_delay` between conflicting
    /// attempts.
    pub fn new(ledger: L, retry_delay: Duration) -> Self {
        let compensation = CompensationCoordinator::new(ledger.clone());
        Self {
            ledger,
            compensation,
            retry_delay,
        }
    }

    /// Creates a coordinator using the delay from `policy`.
    pub fn with_policy(ledger: L, policy: RetryPolicy) -> Self {
        Self::new(ledger, policy.retry_delay)
    }

    /// Deducts every request or none of them effectively.
    ///
    /// Each request gets up to `max_retries` retries on version conflicts.
    /// Insufficient stock is never retried. On the first terminal failure the
    /// remaining requests are skipped, the ones already deducted are restored,
    /// and the original error is returned inside the [`DeductionFailure`].
    ///
    /// Requests with a non-positive quantity reject the whole batch before
    /// the ledger is touched. An empty batch succeeds with an empty report.
    #[tracing::instrument(skip(self, requests), fields(items = requests.len()))]
    pub async fn deduct_all(
        &self,
        checkout_id: CheckoutId,
        requests: &[DeductionRequest],
        max_retries: u32,
    ) -> Result<DeductionReport, DeductionFailure> {
        let mut report = DeductionReport::default();

        if let Some(err) = requests.iter().find_map(|r| r.validate().err()) {
            return Err(DeductionFailure {
                error: CheckoutError::InvalidRequest(err),
                report,
                compensation_failures: Vec::new(),
            });
        }

        for request in requests {
            match self.deduct_one(request, max_retries).await {
                Ok(outcome) => report.record(outcome),
                Err((error, outcome)) => {
                    if let Some(outcome) = outcome {
                        report.record(outcome);
                    }

                    tracing::warn!(
                        %checkout_id,
                        sku = %request.sku_id,
                        error = %error,
                        deducted = report.succeeded.len(),
                        "deduction failed, compensating"
                    );

                    let compensation_failures = self
                        .compensation
                        .restore(checkout_id, &report.succeeded)
                        .await;

                    return Err(DeductionFailure {
                        error,
                        report,
                        compensation_failures,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Attempts one request until it succeeds or fails terminally.
    async fn deduct_one(
        &self,
        request: &DeductionRequest,
        max_retries: u32,
    ) -> Result<DeductionOutcome, (CheckoutError, Option<DeductionOutcome>)> {
        let max_attempts = RetryPolicy::new(max_retries, self.retry_delay).max_attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self
                .ledger
                .decrement(&request.sku_id, request.quantity)
                .await
            {
                Ok(version) => {
                    return Ok(DeductionOutcome::Succeeded {
                        request: request.clone(),
                        version,
                        attempts,
                    });
                }
                Err(StoreError::VersionConflict {
                    expected, actual, ..
                }) => {
                    metrics::counter!("stock_version_conflicts_total").increment(1);
                    tracing::debug!(
                        sku = %request.sku_id,
                        attempt = attempts,
                        %expected,
                        %actual,
                        "version conflict"
                    );

                    if attempts >= max_attempts {
                        return Err((
                            CheckoutError::DeductionExhausted {
                                sku: request.sku_id.clone(),
                                attempts,
                            },
                            Some(DeductionOutcome::RetriesExhausted {
                                request: request.clone(),
                                attempts,
                            }),
                        ));
                    }

                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(StoreError::InsufficientStock {
                    sku,
                    available,
                    requested,
                }) => {
                    return Err((
                        CheckoutError::StockInsufficient {
                            sku,
                            available,
                            requested,
                        },
                        Some(DeductionOutcome::InsufficientStock {
                            request: request.clone(),
                            available,
                            attempts,
                        }),
                    ));
                }
                Err(other) => return Err((CheckoutError::Storage(other), None)),
            }
        }
    }
}
