//! Health and Prometheus metrics endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use inventory_store::{OrderRepository, StockLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use super::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// GET /health: reports whether the order store answers a read.
pub async fn health<L, R>(State(state): State<SharedState<L, R>>) -> impl IntoResponse
where
    L: StockLedger + Clone + 'static,
    R: OrderRepository + 'static,
{
    match state.orchestrator.orders().count().await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                storage: "ok",
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health check could not reach storage");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    storage: "unavailable",
                }),
            )
        }
    }
}

/// GET /metrics: Prometheus text exposition.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
