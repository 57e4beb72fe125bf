//! Checkout engine: stock deduction with compensation, then order creation.
//!
//! A checkout runs in two short, independent transactions:
//! 1. Deduct stock for every cart line, one SKU at a time, retrying
//!    version conflicts a bounded number of times
//! 2. Persist the order and its items
//!
//! If any step fails, the stock already deducted for this attempt is put
//! back. There is no cross-SKU atomic commit; compensation stands in for it.

pub mod assembler;
pub mod compensation;
pub mod deduction;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod policy;
pub mod state;

pub use assembler::OrderAssembler;
pub use compensation::CompensationCoordinator;
pub use deduction::DeductionCoordinator;
pub use error::{CheckoutError, CompensationFailure};
pub use orchestrator::{CheckoutOrchestrator, CheckoutReceipt};
pub use outcome::{DeductionFailure, DeductionOutcome, DeductionReport};
pub use policy::RetryPolicy;
pub use state::{CheckoutAttempt, CheckoutState};
