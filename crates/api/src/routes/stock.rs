//! Stock level endpoints.

use axum::Json;
use axum::extract::{Path, State};
use common::SkuId;
use inventory_store::{OrderRepository, StockLedger, StockRecord};
use serde::{Deserialize, Serialize};

use super::SharedState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub sku: String,
    pub available: i64,
    pub version: i64,
}

impl From<StockRecord> for StockResponse {
    fn from(record: StockRecord) -> Self {
        Self {
            sku: record.sku_id.to_string(),
            available: record.available,
            version: record.version.as_i64(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub available: i64,
}

/// GET /stock/{sku}
#[tracing::instrument(skip(state))]
pub async fn get<L, R>(
    State(state): State<SharedState<L, R>>,
    Path(sku): Path<String>,
) -> Result<Json<StockResponse>, ApiError>
where
    L: StockLedger + Clone + 'static,
    R: OrderRepository + 'static,
{
    let record = state
        .ledger
        .get_stock(&SkuId::new(sku.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("SKU {sku} not found")))?;

    Ok(Json(record.into()))
}

/// PUT /stock/{sku}: sets the on-hand count, creating the SKU if needed.
#[tracing::instrument(skip(state, req))]
pub async fn put<L, R>(
    State(state): State<SharedState<L, R>>,
    Path(sku): Path<String>,
    Json(req): Json<SetStockRequest>,
) -> Result<Json<StockResponse>, ApiError>
where
    L: StockLedger + Clone + 'static,
    R: OrderRepository + 'static,
{
    let sku_id = SkuId::new(sku.as_str());
    let version = state.ledger.put_stock(&sku_id, req.available).await?;
    tracing::info!(%sku_id, available = req.available, %version, "stock level set");

    Ok(Json(StockResponse {
        sku,
        available: req.available,
        version: version.as_i64(),
    }))
}
