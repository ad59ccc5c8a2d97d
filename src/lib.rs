//! Ralph Loop - autonomous spec runner
//!
//! Drives an external coding agent through a task specification, one
//! iteration at a time, until every task is complete, the agent emits a
//! completion promise, or an iteration cap is reached.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`spec`] - Spec format detection, validation, and pending-work counting
//! - [`prompt`] - Format-specific iteration prompts
//! - [`agent`] - Agent subprocess invocation with live output tee
//! - [`ledger`] - Append-only progress ledger
//! - [`changes`] - Best-effort per-iteration git commits
//! - [`telemetry`] - Optional JSONL event log
//! - [`r#loop`] - The controller state machine and exit-code policy
//! - [`config`] - Layered configuration resolution
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Testing infrastructure (traits, mocks, fixtures)
//!
//! # Example
//!
//! ```rust,ignore
//! use ralph_loop::config::LoopConfig;
//! use ralph_loop::r#loop::{LoopController, LoopDependencies};
//!
//! let config = LoopConfig::new("prd.json").with_max_iterations(20);
//! let deps = LoopDependencies::real(&config)?;
//! let outcome = LoopController::new(config, deps)?.run().await?;
//! println!("finished after {} iterations", outcome.iterations);
//! ```

pub mod agent;
pub mod changes;
pub mod config;
pub mod error;
pub mod ledger;
pub mod r#loop;
pub mod prompt;
pub mod spec;
pub mod telemetry;
pub mod testing;

// Re-export commonly used types
pub use error::{LoopError, Result};

pub use config::LoopConfig;
pub use r#loop::{LoopController, LoopDependencies, LoopOutcome, LoopPhase};
pub use spec::{SpecFormat, SpecReader};

// Re-export testing types for convenience
pub use testing::{AgentProcess, GitOperations, MockAgentProcess, MockGitOperations};
