pub mod checkout;
pub mod orders;
pub mod stock;
pub mod system;

use std::sync::Arc;

use ::checkout::CheckoutOrchestrator;

/// Shared application state accessible from all handlers.
pub struct AppState<L, R> {
    pub orchestrator: CheckoutOrchestrator<L, R>,
    pub ledger: L,
}

pub type SharedState<L, R> = Arc<AppState<L, R>>;
