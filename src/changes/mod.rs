//! Per-iteration commits of worktree changes.
//!
//! After each iteration the loop hands off to [`ChangeCommitter`], which
//! commits whatever the agent left in the worktree. Committing is
//! best-effort: failures are logged and reported as
//! [`CommitResult::Skipped`], never raised.
//!
//! # Example
//!
//! ```rust,ignore
//! use ralph_loop::changes::{ChangeCommitter, RealGitOperations};
//! use std::sync::Arc;
//!
//! let committer = ChangeCommitter::new(Arc::new(RealGitOperations::new(".")));
//! let result = committer.commit_if_dirty("prd", 3);
//! ```

pub mod git;

pub use git::RealGitOperations;

use crate::error::LoopError;
use crate::testing::GitOperations;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Trailer appended to every iteration commit.
pub const CO_AUTHOR_TRAILER: &str = "Co-Authored-By: Claude <noreply@anthropic.com>";

/// Outcome of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// Changes were committed with this message.
    Committed { message: String },
    /// The worktree had nothing to commit.
    Clean,
    /// Committing was not possible; the loop carries on.
    Skipped { reason: String },
}

impl CommitResult {
    /// Whether a commit was created.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Commit message for an iteration.
///
/// # Example
///
/// ```
/// use ralph_loop::changes::commit_message;
///
/// let msg = commit_message("prd", 2);
/// assert!(msg.starts_with("[prd] Ralph iteration 2\n\n"));
/// ```
#[must_use]
pub fn commit_message(spec_name: &str, iteration: u32) -> String {
    format!("[{spec_name}] Ralph iteration {iteration}\n\n{CO_AUTHOR_TRAILER}")
}

/// Commits worktree changes after each iteration.
pub struct ChangeCommitter {
    git: Arc<dyn GitOperations>,
}

impl std::fmt::Debug for ChangeCommitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeCommitter")
            .field("git", &"<dyn GitOperations>")
            .finish()
    }
}

impl ChangeCommitter {
    /// Create a committer over `git`.
    #[must_use]
    pub fn new(git: Arc<dyn GitOperations>) -> Self {
        Self { git }
    }

    /// Commit all changes if the worktree is dirty.
    pub fn commit_if_dirty(&self, spec_name: &str, iteration: u32) -> CommitResult {
        match self.git.has_uncommitted_changes() {
            Ok(false) => {
                debug!("No changes to commit after iteration {}", iteration);
                return CommitResult::Clean;
            }
            Ok(true) => {}
            Err(e) => {
                debug!("Skipping commit, git status unavailable: {:#}", e);
                return CommitResult::Skipped {
                    reason: format!("{e:#}"),
                };
            }
        }

        let message = commit_message(spec_name, iteration);
        let attempt = self
            .git
            .stage_all()
            .and_then(|()| self.git.commit(&message));

        match attempt {
            Ok(()) => {
                info!("Committed changes for iteration {}", iteration);
                CommitResult::Committed { message }
            }
            Err(e) => {
                let err = LoopError::commit(format!("{e:#}"));
                warn!("{}", err);
                CommitResult::Skipped {
                    reason: err.to_string(),
                }
            }
        }
    }
}
