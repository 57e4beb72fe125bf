//! Checkout endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{CheckoutId, Money, UserId};
use domain::{CartLine, CartSnapshot, ShippingInfo};
use inventory_store::{OrderRepository, StockLedger};
use serde::{Deserialize, Serialize};

use super::SharedState;
use super::orders::OrderResponse;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Generated when absent.
    pub checkout_id: Option<String>,
    pub user_id: String,
    pub lines: Vec<CheckoutLineRequest>,
    #[serde(default)]
    pub shipping: ShippingInfo,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutLineRequest {
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_id: String,
    pub order_id: String,
    pub order: OrderResponse,
}

impl CheckoutRequest {
    fn into_parts(self) -> Result<(CheckoutId, CartSnapshot, ShippingInfo), ApiError> {
        let checkout_id = match self.checkout_id.as_deref() {
            Some(raw) => CheckoutId::parse(raw)
                .map_err(|e| ApiError::BadRequest(format!("Invalid checkout_id: {e}")))?,
            None => CheckoutId::new(),
        };
        let user_id = UserId::parse(&self.user_id)
            .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;

        let lines = self
            .lines
            .into_iter()
            .map(|line| {
                CartLine::new(
                    line.sku,
                    line.quantity,
                    Money::from_cents(line.unit_price_cents),
                )
            })
            .collect();

        Ok((
            checkout_id,
            CartSnapshot::new(user_id, lines),
            self.shipping,
        ))
    }
}

/// POST /checkout: deducts stock for the cart and creates the order.
#[tracing::instrument(skip(state, req))]
pub async fn create<L, R>(
    State(state): State<SharedState<L, R>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError>
where
    L: StockLedger + Clone + 'static,
    R: OrderRepository + 'static,
{
    let (checkout_id, cart, shipping) = req.into_parts()?;

    let receipt = state
        .orchestrator
        .checkout(checkout_id, &cart, shipping)
        .await?;

    let response = CheckoutResponse {
        checkout_id: receipt.checkout_id.to_string(),
        order_id: receipt.order.id.to_string(),
        order: OrderResponse::from(&receipt.order),
    };

    Ok((StatusCode::CREATED, Json(response)))
}
