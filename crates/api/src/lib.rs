//! HTTP checkout endpoint for the inventory engine.
//!
//! Maps checkout outcomes to status codes, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{CheckoutOrchestrator, RetryPolicy};
use inventory_store::{OrderRepository, StockLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::{AppState, SharedState};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, R>(state: SharedState<L, R>, metrics_handle: PrometheusHandle) -> Router
where
    L: StockLedger + Clone + 'static,
    R: OrderRepository + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<L, R>))
        .route("/checkout", post(routes::checkout::create::<L, R>))
        .route("/orders/{id}", get(routes::orders::get::<L, R>))
        .route(
            "/stock/{sku}",
            get(routes::stock::get::<L, R>).put(routes::stock::put::<L, R>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires a ledger and an order repository into the shared state.
pub fn create_state<L, R>(ledger: L, orders: R, policy: RetryPolicy) -> SharedState<L, R>
where
    L: StockLedger + Clone + 'static,
    R: OrderRepository + 'static,
{
    Arc::new(AppState {
        orchestrator: CheckoutOrchestrator::new(ledger.clone(), orders, policy),
        ledger,
    })
}
