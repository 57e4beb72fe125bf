//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use inventory_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// A checkout that ended in `Failed`.
    Checkout(CheckoutError),
    /// Storage error outside of a checkout.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, reason, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message, "reason": reason });
        (status, axum::Json(body)).into_response()
    }
}

/// Insufficient stock and exhausted retries both tell the user to adjust
/// the cart; exhausted retries additionally invite an immediate retry.
fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, &'static str, String) {
    let status = match &err {
        CheckoutError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        CheckoutError::StockInsufficient { .. } => StatusCode::CONFLICT,
        CheckoutError::DeductionExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CheckoutError::OrderCreation(_) | CheckoutError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.kind(), err.to_string())
}

fn store_error_to_response(err: StoreError) -> (StatusCode, &'static str, String) {
    match &err {
        StoreError::InvalidQuantity { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_request", err.to_string())
        }
        StoreError::SkuNotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "storage", err.to_string()),
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
