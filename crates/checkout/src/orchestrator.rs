//! Checkout flow: deduct, then assemble, compensating on any failure.

use common::CheckoutId;
use domain::{CartSnapshot, DomainError, Order, ShippingInfo};
use inventory_store::{OrderRepository, StockLedger, StoreError};

use crate::assembler::OrderAssembler;
use crate::compensation::CompensationCoordinator;
use crate::deduction::DeductionCoordinator;
use crate::error::CheckoutError;
use crate::outcome::DeductionReport;
use crate::policy::RetryPolicy;
use crate::state::{CheckoutAttempt, CheckoutState};

/// Result of a checkout that reached `Created`.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub checkout_id: CheckoutId,
    pub order: Order,
    pub deduction: DeductionReport,
}

/// Runs checkouts end to end.
///
/// Holds no per-checkout state; any number of checkouts may run through one
/// orchestrator concurrently. Each call blocks until the attempt is
/// `Created` or `Failed`.
pub struct CheckoutOrchestrator<L, R> {
    ledger: L,
    deduction: DeductionCoordinator<L>,
    compensation: CompensationCoordinator<L>,
    assembler: OrderAssembler<R>,
    policy: RetryPolicy,
}

impl<L, R> CheckoutOrchestrator<L, R>
where
    L: StockLedger + Clone,
    R: OrderRepository,
{
    pub fn new(ledger: L, orders: R, policy: RetryPolicy) -> Self {
        Self {
            deduction: DeductionCoordinator::with_policy(ledger.clone(), policy),
            compensation: CompensationCoordinator::new(ledger.clone()),
            ledger,
            assembler: OrderAssembler::new(orders),
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn orders(&self) -> &R {
        self.assembler.repository()
    }

    /// Checks out a cart.
    ///
    /// `checkout_id` identifies this one attempt; restores are recorded
    /// against it. The id is claimed before any stock moves, and an id that
    /// was claimed before is rejected with `InvalidRequest`, so retrying a
    /// failed checkout needs a fresh id.
    ///
    /// On success every cart line is deducted and exactly one order exists
    /// with one item per line. On failure no order exists and stock for every
    /// line that had been deducted was restored (or the restore failure was
    /// logged). The returned error is always the one that stopped the
    /// checkout, never a compensation error.
    #[tracing::instrument(skip(self, cart, shipping), fields(user_id = %cart.user_id, lines = cart.lines.len()))]
    pub async fn checkout(
        &self,
        checkout_id: CheckoutId,
        cart: &CartSnapshot,
        shipping: ShippingInfo,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();
        let mut attempt = CheckoutAttempt::new(checkout_id);

        let result = self.run(&mut attempt, cart, shipping).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(receipt) => {
                metrics::counter!("checkout_created_total").increment(1);
                tracing::info!(
                    %checkout_id,
                    order_id = %receipt.order.id,
                    items = receipt.order.items.len(),
                    "checkout created order"
                );
            }
            Err(err) => {
                metrics::counter!("checkout_failed_total", "reason" => err.kind()).increment(1);
                tracing::warn!(
                    %checkout_id,
                    reason = err.kind(),
                    error = %err,
                    path = ?attempt.history(),
                    "checkout failed"
                );
            }
        }

        result
    }

    async fn run(
        &self,
        attempt: &mut CheckoutAttempt,
        cart: &CartSnapshot,
        shipping: ShippingInfo,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let checkout_id = attempt.checkout_id();

        if let Err(err) = cart.validate() {
            attempt.advance(CheckoutState::Failed);
            return Err(err.into());
        }

        if let Err(err) = self.ledger.begin_attempt(checkout_id).await {
            attempt.advance(CheckoutState::Failed);
            return Err(match err {
                StoreError::AttemptReused(id) => DomainError::CheckoutReused(id).into(),
                other => other.into(),
            });
        }

        attempt.advance(CheckoutState::Deducting);
        let requests = cart.deduction_requests();
        let report = match self
            .deduction
            .deduct_all(checkout_id, &requests, self.policy.max_retries)
            .await
        {
            Ok(report) => report,
            Err(failure) => {
                // The deduction coordinator has already restored its prefix.
                attempt.advance(CheckoutState::Compensating);
                attempt.advance(CheckoutState::Failed);
                return Err(failure.into());
            }
        };

        attempt.advance(CheckoutState::Assembling);
        match self
            .assembler
            .create_order(cart.user_id, &report.succeeded, &cart.unit_prices(), shipping)
            .await
        {
            Ok(order) => {
                attempt.advance(CheckoutState::Created);
                Ok(CheckoutReceipt {
                    checkout_id,
                    order,
                    deduction: report,
                })
            }
            Err(err) => {
                attempt.advance(CheckoutState::Compensating);
                let failures = self
                    .compensation
                    .restore(checkout_id, &report.succeeded)
                    .await;
                if !failures.is_empty() {
                    tracing::warn!(
                        %checkout_id,
                        failed_restores = failures.len(),
                        "compensation after order failure was incomplete"
                    );
                }
                attempt.advance(CheckoutState::Failed);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, UserId};
    use domain::CartLine;
    use inventory_store::{InMemoryOrderRepository, InMemoryStockLedger};

    type TestOrchestrator = CheckoutOrchestrator<InMemoryStockLedger, InMemoryOrderRepository>;

    async fn setup(
        stock: &[(&'static str, i64)],
    ) -> (TestOrchestrator, InMemoryStockLedger, InMemoryOrderRepository) {
        let ledger = InMemoryStockLedger::with_stock(stock.iter().copied())
            .await
            .unwrap();
        let orders = InMemoryOrderRepository::new();
        let orchestrator =
            CheckoutOrchestrator::new(ledger.clone(), orders.clone(), RetryPolicy::immediate(3));
        (orchestrator, ledger, orders)
    }

    fn cart(lines: &[(&str, i64)]) -> CartSnapshot {
        CartSnapshot::new(
            UserId::new(),
            lines
                .iter()
                .map(|(sku, qty)| CartLine::new(*sku, *qty, Money::from_cents(500)))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (orchestrator, ledger, orders) = setup(&[("SKU-1", 10)]).await;

        let receipt = orchestrator
            .checkout(CheckoutId::new(), &cart(&[("SKU-1", 3)]), ShippingInfo::default())
            .await
            .unwrap();

        assert_eq!(receipt.order.items.len(), 1);
        assert_eq!(receipt.order.items[0].quantity, 3);
        assert_eq!(receipt.deduction.succeeded.len(), 1);
        assert_eq!(ledger.available("SKU-1").await, Some(7));
        assert_eq!(orders.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let (orchestrator, ledger, orders) = setup(&[("SKU-1", 10)]).await;

        let err = orchestrator
            .checkout(CheckoutId::new(), &cart(&[]), ShippingInfo::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InvalidRequest(DomainError::EmptyCart)
        ));
        assert_eq!(ledger.decrement_attempts().await, 0);
        assert_eq!(orders.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reused_checkout_id_rejected_before_deduction() {
        let (orchestrator, ledger, orders) = setup(&[("SKU-1", 10)]).await;
        let checkout_id = CheckoutId::new();

        orchestrator
            .checkout(checkout_id, &cart(&[("SKU-1", 3)]), ShippingInfo::default())
            .await
            .unwrap();
        let err = orchestrator
            .checkout(checkout_id, &cart(&[("SKU-1", 3)]), ShippingInfo::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InvalidRequest(DomainError::CheckoutReused(id)) if id == checkout_id
        ));
        assert_eq!(ledger.decrement_attempts().await, 1);
        assert_eq!(ledger.available("SKU-1").await, Some(7));
        assert_eq!(orders.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_cart_does_not_claim_checkout_id() {
        let (orchestrator, ledger, _) = setup(&[("SKU-1", 10)]).await;
        let checkout_id = CheckoutId::new();

        let err = orchestrator
            .checkout(checkout_id, &cart(&[]), ShippingInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidRequest(DomainError::EmptyCart)));

        orchestrator
            .checkout(checkout_id, &cart(&[("SKU-1", 1)]), ShippingInfo::default())
            .await
            .unwrap();
        assert_eq!(ledger.available("SKU-1").await, Some(9));
    }

    #[tokio::test]
    async fn test_assembly_failure_restores_all_items() {
        let (orchestrator, ledger, orders) = setup(&[("SKU-1", 10), ("SKU-2", 4)]).await;
        orders.set_fail_on_insert(true).await;

        let err = orchestrator
            .checkout(
                CheckoutId::new(),
                &cart(&[("SKU-1", 3), ("SKU-2", 4)]),
                ShippingInfo::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OrderCreation(_)));
        assert_eq!(ledger.available("SKU-1").await, Some(10));
        assert_eq!(ledger.available("SKU-2").await, Some(4));
        assert_eq!(orders.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_assembly_failure_with_broken_restore_still_returns_order_error() {
        let (orchestrator, ledger, orders) = setup(&[("SKU-1", 10)]).await;
        orders.set_fail_on_insert(true).await;
        ledger.set_fail_on_increment("SKU-1", true).await;

        let err = orchestrator
            .checkout(CheckoutId::new(), &cart(&[("SKU-1", 3)]), ShippingInfo::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OrderCreation(_)));
        assert_eq!(ledger.available("SKU-1").await, Some(7));
    }
}
