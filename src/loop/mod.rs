//! Loop management module.
//!
//! - [`controller`] - The controller that runs iterations and decides when to stop
//! - [`state`] - Loop phases, iteration outcomes, and the run outcome
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!               ┌───>│ SpecReader   │  pending count, re-read every iteration
//!               │    ├──────────────┤
//! ┌───────────┐ ├───>│ PromptBuilder│
//! │   Loop    │ │    ├──────────────┤
//! │Controller │─┼───>│ AgentRunner  │──> agent subprocess (tee)
//! └───────────┘ │    ├──────────────┤
//!               ├───>│ProgressLedger│  marker + status per iteration
//!               │    ├──────────────┤
//!               └───>│ChangeCommitter│ best-effort git commit
//!                    └──────────────┘
//! ```

pub mod controller;
pub mod state;

// Re-exports for convenience
pub use controller::{LoopController, LoopDependencies};
pub use state::{IterationOutcome, IterationRecord, LoopOutcome, LoopPhase};
