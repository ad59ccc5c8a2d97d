//! Git operations backed by the `git` CLI.

use crate::testing::GitOperations;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::{Command, Output};

/// Real git operations implementation.
///
/// Executes actual git commands in the working directory.
#[derive(Debug, Clone)]
pub struct RealGitOperations {
    repo_dir: PathBuf,
}

impl RealGitOperations {
    /// Create a new git operations instance for the given directory.
    #[must_use]
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .with_context(|| format!("Failed to run git {}", args.first().unwrap_or(&"")))
    }
}

impl GitOperations for RealGitOperations {
    fn has_uncommitted_changes(&self) -> Result<bool> {
        let output = self.git(&["status", "--porcelain"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git status failed: {}", stderr.trim())
        }
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    fn stage_all(&self) -> Result<()> {
        let output = self.git(&["add", "-A"])?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git add failed: {}", stderr.trim())
        }
    }

    fn commit(&self, message: &str) -> Result<()> {
        let output = self.git(&["commit", "-m", message])?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git commit failed: {}", stderr.trim())
        }
    }
}
