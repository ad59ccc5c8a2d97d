//! Trait definitions for testable abstractions.
//!
//! These traits abstract the loop's external collaborators so the controller
//! can be exercised without a real git repository or agent subprocess.

use crate::agent::AgentOutput;
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction for git operations.
///
/// # Example
///
/// ```rust,ignore
/// use ralph_loop::testing::GitOperations;
///
/// fn needs_commit(git: &impl GitOperations) -> bool {
///     git.has_uncommitted_changes().unwrap_or(false)
/// }
/// ```
pub trait GitOperations: Send + Sync {
    /// Whether the worktree has staged, unstaged, or untracked changes.
    ///
    /// # Errors
    ///
    /// Returns an error if git is not available or not in a repository.
    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Stage every change in the worktree.
    ///
    /// # Errors
    ///
    /// Returns an error if staging fails.
    fn stage_all(&self) -> Result<()>;

    /// Commit the staged changes with `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails (hooks, identity, nothing staged).
    fn commit(&self, message: &str) -> Result<()>;
}

/// Abstraction for the coding-agent subprocess.
///
/// This trait is async to support non-blocking process execution.
///
/// # Example
///
/// ```rust,ignore
/// use ralph_loop::testing::AgentProcess;
///
/// async fn succeeded(agent: &impl AgentProcess) -> bool {
///     matches!(agent.run("Do the next task").await, Ok(out) if out.exit_code == 0)
/// }
/// ```
#[async_trait]
pub trait AgentProcess: Send + Sync {
    /// Human-readable command line, recorded in telemetry.
    fn command_line(&self) -> String;

    /// Run the agent once with `prompt` and capture its output.
    ///
    /// A nonzero exit is not an error; it is reported through
    /// [`AgentOutput::exit_code`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or its output
    /// cannot be read.
    async fn run(&self, prompt: &str) -> Result<AgentOutput>;
}
