//! Execution state machine
//!
//! Per file the manager moves through
//! `Idle → Opening ⇄ Checkout → RunningTask(0) → … → RunningTask(k) → Idle`.
//! A skipped file stays in `Idle`; a failing task returns straight to `Idle`.

use crate::error::TransitionError;
use std::fmt;

/// Phase of a manager's execution loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionPhase {
    /// Not processing a file
    #[default]
    Idle,
    /// Validating and opening the current file
    Opening,
    /// Requesting a version-control checkout
    Checkout,
    /// Running the task at this list position
    RunningTask(usize),
}

impl ExecutionPhase {
    /// Check for [`ExecutionPhase::Idle`]
    #[inline]
    #[must_use]
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Opening => f.write_str("opening"),
            Self::Checkout => f.write_str("checkout"),
            Self::RunningTask(index) => write!(f, "running task {index}"),
        }
    }
}

/// Validate a phase transition
///
/// # Errors
/// Returns [`TransitionError`] when `to` is not reachable from `from`
pub fn validate_transition(
    from: ExecutionPhase,
    to: ExecutionPhase,
) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: ExecutionPhase) -> Vec<ExecutionPhase> {
    use ExecutionPhase::{Checkout, Idle, Opening, RunningTask};
    match from {
        Idle => vec![Idle, Opening, Checkout],
        Opening => vec![Checkout, RunningTask(0), Idle],
        Checkout => vec![Opening, RunningTask(0), Idle],
        RunningTask(index) => vec![RunningTask(index + 1), Idle],
    }
}
