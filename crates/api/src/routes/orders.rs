//! Order read endpoint.

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{Order, ShippingInfo};
use inventory_store::{OrderRepository, StockLedger};
use serde::Serialize;

use super::SharedState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    /// `None` only for a stored order whose total no longer fits.
    pub total_cents: Option<i64>,
    pub shipping: ShippingInfo,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    sku: item.sku_id.to_string(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_cents: order.total_amount().ok().map(|total| total.cents()),
            shipping: order.shipping.clone(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<L, R>(
    State(state): State<SharedState<L, R>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: StockLedger + Clone + 'static,
    R: OrderRepository + 'static,
{
    let order_id = OrderId::parse(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;

    let order = state
        .orchestrator
        .orders()
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}
