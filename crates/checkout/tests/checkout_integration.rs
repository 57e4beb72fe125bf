//! End-to-end checkout tests against an in-memory SQLite database.

use std::sync::Arc;

use checkout::{
    CheckoutError, CheckoutOrchestrator, CheckoutState, CompensationCoordinator,
    CompensationFailure, RetryPolicy,
};
use common::{CheckoutId, Money, SkuId, UserId};
use domain::{CartLine, CartSnapshot, DeductionRequest, DomainError, ShippingInfo};
use inventory_store::{
    GovernorConfig, InMemoryOrderRepository, InMemoryStockLedger, OrderRepository,
    SqliteOrderRepository, SqliteStockLedger, StockLedger, StorageGovernor,
};

type SqliteOrchestrator = CheckoutOrchestrator<SqliteStockLedger, SqliteOrderRepository>;

struct TestHarness {
    orchestrator: Arc<SqliteOrchestrator>,
    ledger: SqliteStockLedger,
    orders: SqliteOrderRepository,
}

impl TestHarness {
    async fn new(stock: &[(&str, i64)]) -> Self {
        Self::with_policy(stock, RetryPolicy::default()).await
    }

    async fn with_policy(stock: &[(&str, i64)], policy: RetryPolicy) -> Self {
        let pool = StorageGovernor::new(GovernorConfig::in_memory())
            .unwrap()
            .open()
            .await
            .unwrap();

        let ledger = SqliteStockLedger::new(pool.clone());
        let orders = SqliteOrderRepository::new(pool);
        for (sku, available) in stock {
            ledger.put_stock(&SkuId::new(*sku), *available).await.unwrap();
        }

        let orchestrator = Arc::new(CheckoutOrchestrator::new(
            ledger.clone(),
            orders.clone(),
            policy,
        ));

        Self {
            orchestrator,
            ledger,
            orders,
        }
    }

    async fn available(&self, sku: &str) -> i64 {
        self.ledger
            .get_stock(&SkuId::new(sku))
            .await
            .unwrap()
            .unwrap()
            .available
    }
}

fn cart(lines: &[(&str, i64)]) -> CartSnapshot {
    CartSnapshot::new(
        UserId::new(),
        lines
            .iter()
            .map(|(sku, qty)| CartLine::new(*sku, *qty, Money::from_cents(1250)))
            .collect(),
    )
}

fn shipping() -> ShippingInfo {
    ShippingInfo::new("Ada Lovelace", "12 Analytical St", "London", "N1 9GU")
}

#[tokio::test]
async fn test_single_item_checkout_creates_order() {
    let h = TestHarness::new(&[("SKU-1", 10)]).await;

    let receipt = h
        .orchestrator
        .checkout(CheckoutId::new(), &cart(&[("SKU-1", 3)]), shipping())
        .await
        .unwrap();

    assert_eq!(h.available("SKU-1").await, 7);

    let stored = h.orders.get(receipt.order.id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].sku_id, SkuId::new("SKU-1"));
    assert_eq!(stored.items[0].quantity, 3);
    assert_eq!(stored.total_amount().unwrap().cents(), 3750);
    assert_eq!(stored.shipping, shipping());
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_untouched() {
    let h = TestHarness::new(&[("SKU-1", 2)]).await;

    let err = h
        .orchestrator
        .checkout(CheckoutId::new(), &cart(&[("SKU-1", 3)]), shipping())
        .await
        .unwrap_err();

    assert!(err.is_user_adjustable());
    match err {
        CheckoutError::StockInsufficient {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    assert_eq!(h.available("SKU-1").await, 2);
    assert_eq!(h.orders.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_second_item_short_restores_first() {
    let h = TestHarness::new(&[("SKU-1", 5), ("SKU-2", 1)]).await;

    let err = h
        .orchestrator
        .checkout(
            CheckoutId::new(),
            &cart(&[("SKU-1", 2), ("SKU-2", 2)]),
            shipping(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::StockInsufficient { ref sku, .. } if sku.as_str() == "SKU-2"));
    assert_eq!(h.available("SKU-1").await, 5);
    assert_eq!(h.available("SKU-2").await, 1);
    assert_eq!(h.orders.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failure_late_in_cart_restores_whole_prefix() {
    let h = TestHarness::new(&[("A", 4), ("B", 6), ("C", 8), ("D", 0)]).await;

    let err = h
        .orchestrator
        .checkout(
            CheckoutId::new(),
            &cart(&[("A", 1), ("B", 2), ("C", 3), ("D", 1)]),
            shipping(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::StockInsufficient { .. }));
    assert_eq!(h.available("A").await, 4);
    assert_eq!(h.available("B").await, 6);
    assert_eq!(h.available("C").await, 8);
    assert_eq!(h.available("D").await, 0);
    assert_eq!(h.orders.count().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_concurrent_checkouts_for_scarce_stock() {
    let h = TestHarness::with_policy(&[("SKU-1", 5)], RetryPolicy::immediate(3)).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let orchestrator = h.orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .checkout(CheckoutId::new(), &cart(&[("SKU-1", 4)]), shipping())
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(CheckoutError::StockInsufficient { .. })
            | Err(CheckoutError::DeductionExhausted { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(h.available("SKU-1").await, 1);
    assert_eq!(h.orders.count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_checkouts_never_oversell() {
    let h = TestHarness::with_policy(&[("SKU-1", 12), ("SKU-2", 30)], RetryPolicy::immediate(3))
        .await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let orchestrator = h.orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .checkout(
                    CheckoutId::new(),
                    &cart(&[("SKU-2", 1), ("SKU-1", 2)]),
                    shipping(),
                )
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                assert_eq!(receipt.order.items.len(), 2);
                created += 1;
            }
            Err(err) => assert!(err.is_user_adjustable(), "unexpected error: {err}"),
        }
    }

    let sku1 = h.available("SKU-1").await;
    let sku2 = h.available("SKU-2").await;
    assert!(sku1 >= 0);
    assert!(created <= 6);
    // Every failed checkout gave its units back.
    assert_eq!(sku1, 12 - 2 * created);
    assert_eq!(sku2, 30 - created);
    assert_eq!(h.orders.count().await.unwrap(), created as u64);
}

#[tokio::test]
async fn test_duplicate_sku_in_cart_rejected_before_deduction() {
    let h = TestHarness::new(&[("SKU-1", 10)]).await;

    let err = h
        .orchestrator
        .checkout(
            CheckoutId::new(),
            &cart(&[("SKU-1", 1), ("SKU-1", 2)]),
            shipping(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidRequest(_)));
    assert!(!err.is_user_adjustable());
    assert_eq!(h.available("SKU-1").await, 10);
}

#[tokio::test]
async fn test_unknown_sku_fails_as_storage_error_and_compensates() {
    let h = TestHarness::new(&[("SKU-1", 10)]).await;

    let err = h
        .orchestrator
        .checkout(
            CheckoutId::new(),
            &cart(&[("SKU-1", 4), ("GHOST", 1)]),
            shipping(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Storage(_)));
    assert_eq!(err.kind(), "storage");
    assert_eq!(h.available("SKU-1").await, 10);
    assert_eq!(h.orders.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_permanent_contention_exhausts_retries() {
    let ledger = InMemoryStockLedger::with_stock([("HOT", 100), ("COLD", 100)])
        .await
        .unwrap();
    ledger.set_contended("HOT", true).await;
    let orders = InMemoryOrderRepository::new();
    let orchestrator =
        CheckoutOrchestrator::new(ledger.clone(), orders.clone(), RetryPolicy::immediate(2));

    let err = orchestrator
        .checkout(
            CheckoutId::new(),
            &cart(&[("COLD", 5), ("HOT", 1)]),
            shipping(),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::DeductionExhausted { ref sku, attempts } => {
            assert_eq!(sku.as_str(), "HOT");
            assert_eq!(attempts, 3);
        }
        ref other => panic!("expected exhausted retries, got {other:?}"),
    }
    assert!(err.is_user_adjustable());
    // one attempt for COLD, three for HOT
    assert_eq!(ledger.decrement_attempts().await, 4);
    assert_eq!(ledger.available("COLD").await, Some(100));
    assert_eq!(orders.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_order_failure_restores_every_deducted_item() {
    let ledger = InMemoryStockLedger::with_stock([("SKU-1", 5), ("SKU-2", 5)])
        .await
        .unwrap();
    let orders = InMemoryOrderRepository::new();
    orders.set_fail_on_insert(true).await;
    let orchestrator =
        CheckoutOrchestrator::new(ledger.clone(), orders.clone(), RetryPolicy::default());

    let err = orchestrator
        .checkout(
            CheckoutId::new(),
            &cart(&[("SKU-1", 2), ("SKU-2", 5)]),
            shipping(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::OrderCreation(_)));
    assert_eq!(err.kind(), "order_creation");
    assert_eq!(ledger.available("SKU-1").await, Some(5));
    assert_eq!(ledger.available("SKU-2").await, Some(5));
    assert_eq!(orders.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_replayed_compensation_restores_once() {
    let h = TestHarness::new(&[("SKU-1", 5), ("SKU-2", 5)]).await;
    let checkout_id = CheckoutId::new();
    let deducted = [
        DeductionRequest::new("SKU-1", 2),
        DeductionRequest::new("SKU-2", 3),
    ];
    for request in &deducted {
        h.ledger
            .decrement(&request.sku_id, request.quantity)
            .await
            .unwrap();
    }

    let compensation = CompensationCoordinator::new(h.ledger.clone());
    assert!(compensation.restore(checkout_id, &deducted).await.is_empty());

    let replayed = compensation.restore(checkout_id, &deducted).await;
    assert_eq!(replayed.len(), 2);
    assert!(
        replayed
            .iter()
            .all(|f| matches!(f, CompensationFailure::AlreadyRestored { .. }))
    );

    assert_eq!(h.available("SKU-1").await, 5);
    assert_eq!(h.available("SKU-2").await, 5);
}

#[tokio::test]
async fn test_reused_checkout_id_never_leaks_stock() {
    let h = TestHarness::new(&[("SKU-1", 5), ("SKU-2", 1)]).await;
    let checkout_id = CheckoutId::new();
    let cart = cart(&[("SKU-1", 2), ("SKU-2", 2)]);

    let first = h
        .orchestrator
        .checkout(checkout_id, &cart, shipping())
        .await
        .unwrap_err();
    assert!(matches!(first, CheckoutError::StockInsufficient { .. }));

    for _ in 0..2 {
        let err = h
            .orchestrator
            .checkout(checkout_id, &cart, shipping())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidRequest(DomainError::CheckoutReused(id)) if id == checkout_id
        ));
    }

    assert_eq!(h.available("SKU-1").await, 5);
    assert_eq!(h.available("SKU-2").await, 1);
    assert_eq!(h.orders.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_overflowing_cart_total_rejected_before_deduction() {
    let h = TestHarness::new(&[("SKU-1", 5), ("SKU-2", 5)]).await;
    let price = Money::from_cents(i64::MAX / 2 + 1);
    let cart = CartSnapshot::new(
        UserId::new(),
        vec![
            CartLine::new("SKU-1", 1, price),
            CartLine::new("SKU-2", 1, price),
        ],
    );

    let err = h
        .orchestrator
        .checkout(CheckoutId::new(), &cart, shipping())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InvalidRequest(DomainError::AmountOverflow(_))
    ));
    assert_eq!(h.available("SKU-1").await, 5);
    assert_eq!(h.available("SKU-2").await, 5);
    assert_eq!(h.orders.count().await.unwrap(), 0);
}

#[test]
fn test_state_paths() {
    use CheckoutState::*;

    let success = [Start, Deducting, Assembling, Created];
    let failure = [Start, Deducting, Compensating, Failed];

    for path in [&success[..], &failure[..]] {
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
        }
        assert!(path[path.len() - 1].is_terminal());
    }
}
