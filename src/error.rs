//! Custom error types for the Ralph loop.
//!
//! The taxonomy mirrors how the loop treats each failure: spec problems are
//! detected once at startup and abort the run, agent invocation errors abort
//! mid-loop, while agent failures and commit failures are recoverable.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for loop operations
#[derive(Error, Debug)]
pub enum LoopError {
    // =========================================================================
    // Spec Errors
    // =========================================================================
    /// Spec file does not exist or is not a regular file
    #[error("Spec file not found: {path}")]
    SpecNotFound { path: PathBuf },

    /// Neither the extension nor the content identifies the spec format
    #[error(
        "Could not detect spec format for: {path}\n\
         Use .json or .md extension, or ensure the file contains \
         a 'stories' array (JSON) or '## Step by Step Tasks' section (Markdown)."
    )]
    FormatUndetectable { path: PathBuf },

    /// Spec failed structural validation
    #[error("{message}")]
    InvalidSpec { message: String, path: PathBuf },

    // =========================================================================
    // Agent Errors
    // =========================================================================
    /// Launching or streaming the agent process failed
    #[error("Agent invocation failed: {message}")]
    AgentInvocation { message: String },

    /// Agent exited with a nonzero status
    #[error("Agent exited with code {exit_code} in iteration {iteration}")]
    AgentFailure { exit_code: i32, iteration: u32 },

    // =========================================================================
    // Ledger Errors
    // =========================================================================
    /// Creating or appending to the progress ledger failed
    #[error("Progress ledger error at {path}: {source}")]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Version Control Errors
    // =========================================================================
    /// Staging or committing iteration changes failed
    #[error("Commit failed: {message}")]
    Commit { message: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load or parse configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LoopError {
    /// Create an invalid spec error
    pub fn invalid_spec(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Create an agent invocation error
    pub fn agent_invocation(message: impl Into<String>) -> Self {
        Self::AgentInvocation {
            message: message.into(),
        }
    }

    /// Create a ledger error
    pub fn ledger(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Ledger {
            path: path.into(),
            source,
        }
    }

    /// Create a commit error
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Short machine-readable kind, used for telemetry error events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SpecNotFound { .. } => "spec_not_found",
            Self::FormatUndetectable { .. } => "format_undetectable",
            Self::InvalidSpec { .. } => "invalid_spec",
            Self::AgentInvocation { .. } => "agent_invocation",
            Self::AgentFailure { .. } => "agent_failure",
            Self::Ledger { .. } => "ledger",
            Self::Commit { .. } => "commit",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Type alias for loop results
pub type Result<T> = std::result::Result<T, LoopError>;
