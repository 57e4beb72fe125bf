//! Per-request results of a deduction pass.

use domain::DeductionRequest;
use inventory_store::Version;

use crate::error::{CheckoutError, CompensationFailure};

/// Terminal state of one deduction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeductionOutcome {
    /// Stock was taken; the record now carries `version`.
    Succeeded {
        request: DeductionRequest,
        version: Version,
        attempts: u32,
    },
    /// Not enough units on hand.
    InsufficientStock {
        request: DeductionRequest,
        available: i64,
        attempts: u32,
    },
    /// Every allowed attempt hit a version conflict.
    RetriesExhausted {
        request: DeductionRequest,
        attempts: u32,
    },
}

impl DeductionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeductionOutcome::Succeeded { .. })
    }
}

/// What a deduction pass did, in request order.
///
/// Lives only for the duration of one checkout attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeductionReport {
    /// Requests whose stock was actually taken.
    pub succeeded: Vec<DeductionRequest>,
    pub outcomes: Vec<DeductionOutcome>,
}

impl DeductionReport {
    pub(crate) fn record(&mut self, outcome: DeductionOutcome) {
        if let DeductionOutcome::Succeeded { request, .. } = &outcome {
            self.succeeded.push(request.clone());
        }
        self.outcomes.push(outcome);
    }
}

/// A deduction pass that stopped early.
///
/// By the time this is returned, compensation has already run for
/// `report.succeeded`. The report and the compensation failures are
/// informational; callers must not create an order.
#[derive(Debug)]
pub struct DeductionFailure {
    pub error: CheckoutError,
    pub report: DeductionReport,
    pub compensation_failures: Vec<CompensationFailure>,
}

impl std::fmt::Display for DeductionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} deducted item(s) compensated, {} restore failure(s))",
            self.error,
            self.report.succeeded.len(),
            self.compensation_failures.len()
        )
    }
}

impl std::error::Error for DeductionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<DeductionFailure> for CheckoutError {
    fn from(failure: DeductionFailure) -> Self {
        failure.error
    }
}
