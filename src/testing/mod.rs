//! Testing infrastructure for the Ralph loop.
//!
//! This module provides traits, mocks, and fixtures for testing the loop and
//! its components without real external dependencies.
//!
//! # Architecture
//!
//! - **Traits**: Abstractions for external collaborators (git, agent subprocess)
//! - **Mocks**: Test doubles that implement the traits with controllable behavior
//! - **Fixtures**: Temporary spec workspaces (test-only)
//!
//! # Example
//!
//! ```rust,ignore
//! use ralph_loop::testing::{MockAgentProcess, MockGitOperations, SpecFixture};
//!
//! let git = MockGitOperations::new().with_dirty_worktree();
//! let agent = MockAgentProcess::new().with_exit_code(0);
//! let fixture = SpecFixture::task_doc(&[true, false]);
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod mocks;
pub mod traits;

#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;
pub use traits::*;
