//! Loop state types and transitions.
//!
//! This module defines the phase machine driven by the controller and the
//! records it produces for each iteration and for the run as a whole.

use serde::Serialize;
use std::time::Duration;

/// Phase of the loop state machine.
///
/// `Init -> Iterating -> {Done, Capped, Failed}`.
///
/// # Example
///
/// ```
/// use ralph_loop::r#loop::state::LoopPhase;
///
/// assert_eq!(LoopPhase::Capped.to_string(), "capped");
/// assert!(LoopPhase::Done.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    /// Spec detected and validated, ledger ready
    Init,
    /// Running iterations
    Iterating,
    /// Nothing pending, or the completion promise was seen
    Done,
    /// Iteration cap reached
    Capped,
    /// Aborted by a fatal error
    Failed,
}

impl LoopPhase {
    /// Whether the loop has stopped.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Capped | Self::Failed)
    }
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Init => write!(f, "init"),
            LoopPhase::Iterating => write!(f, "iterating"),
            LoopPhase::Done => write!(f, "done"),
            LoopPhase::Capped => write!(f, "capped"),
            LoopPhase::Failed => write!(f, "failed"),
        }
    }
}

/// How a single iteration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Agent exited 0.
    Completed,
    /// Agent exited nonzero.
    Failed { exit_code: i32 },
    /// Agent could not be launched or streamed.
    Exception { message: String },
}

impl IterationOutcome {
    /// Text written after `Status: ` in the ledger.
    ///
    /// # Example
    ///
    /// ```
    /// use ralph_loop::r#loop::state::IterationOutcome;
    ///
    /// let outcome = IterationOutcome::Exception { message: "boom".into() };
    /// assert_eq!(outcome.ledger_status(), "Exception: boom");
    /// ```
    #[must_use]
    pub fn ledger_status(&self) -> String {
        match self {
            Self::Completed => "Completed".to_string(),
            Self::Failed { .. } => "Failed".to_string(),
            Self::Exception { message } => format!("Exception: {message}"),
        }
    }

    /// Whether the agent exited 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Everything recorded about one iteration.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub iteration: u32,
    /// Local start time, ledger format
    pub started_at: String,
    pub prompt: String,
    /// `None` when the agent never ran to completion
    pub exit_code: Option<i32>,
    pub output: String,
    pub duration: Duration,
    pub outcome: IterationOutcome,
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Terminal phase, `Done` or `Capped`
    pub phase: LoopPhase,
    /// Number of agent invocations
    pub iterations: u32,
    /// Pending units at the final re-check
    pub pending: usize,
    /// Whether the completion promise ended the run
    pub promise_detected: bool,
    pub records: Vec<IterationRecord>,
}

impl LoopOutcome {
    /// Whether all work is complete at the final re-check.
    ///
    /// The completion promise ends the loop but does not decide success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.pending == 0
    }

    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}
