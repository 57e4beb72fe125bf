//! Checkout state machine.

use common::CheckoutId;
use serde::{Deserialize, Serialize};

/// The state of one checkout attempt.
///
/// State transitions:
/// ```text
/// Start ──► Deducting ──► Assembling ──► Created
///   │           │              │
///   │           └─► Compensating ◄─┘
///   │                    │
///   └──────────────────► Failed
/// ```
///
/// `Start ──► Failed` is taken only when the cart is rejected before any
/// stock is touched. Nothing here is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    #[default]
    Start,

    /// Stock is being deducted line by line.
    Deducting,

    /// Every line was deducted; the order is being written.
    Assembling,

    /// A step failed and deducted stock is being restored.
    Compensating,

    /// Order persisted (terminal state).
    Created,

    /// Attempt abandoned (terminal state).
    Failed,
}

impl CheckoutState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Start, Deducting)
                | (Start, Failed)
                | (Deducting, Assembling)
                | (Deducting, Compensating)
                | (Assembling, Created)
                | (Assembling, Compensating)
                | (Compensating, Failed)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Created | CheckoutState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Start => "Start",
            CheckoutState::Deducting => "Deducting",
            CheckoutState::Assembling => "Assembling",
            CheckoutState::Compensating => "Compensating",
            CheckoutState::Created => "Created",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the state of a single checkout as it runs.
#[derive(Debug, Clone)]
pub struct CheckoutAttempt {
    checkout_id: CheckoutId,
    state: CheckoutState,
    history: Vec<CheckoutState>,
}

impl CheckoutAttempt {
    pub fn new(checkout_id: CheckoutId) -> Self {
        Self {
            checkout_id,
            state: CheckoutState::Start,
            history: vec![CheckoutState::Start],
        }
    }

    pub fn checkout_id(&self) -> CheckoutId {
        self.checkout_id
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Every state visited, in order, starting with `Start`.
    pub fn history(&self) -> &[CheckoutState] {
        &self.history
    }

    /// Moves to `next`.
    ///
    /// Returns false and stays put if the transition is not legal.
    pub fn advance(&mut self, next: CheckoutState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                checkout_id = %self.checkout_id,
                from = %self.state,
                to = %next,
                "illegal checkout state transition"
            );
            return false;
        }

        tracing::debug!(
            checkout_id = %self.checkout_id,
            from = %self.state,
            to = %next,
            "checkout state changed"
        );
        self.state = next;
        self.history.push(next);
        true
    }
}
