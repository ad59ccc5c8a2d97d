//! Run configuration.
//!
//! A [`LoopConfig`] is assembled once per run from built-in defaults, the
//! layered config files (see [`resolution`]), and command-line flags, in
//! that order of increasing priority. It is immutable for the rest of the run.
//!
//! # Example
//!
//! ```
//! use ralph_loop::config::LoopConfig;
//! use std::time::Duration;
//!
//! let config = LoopConfig::new("prd.json")
//!     .with_max_iterations(10)
//!     .with_iteration_delay(Duration::ZERO);
//! assert_eq!(config.model, "claude");
//! assert!(config.validate().is_ok());
//! ```

pub mod resolution;

pub use resolution::{ConfigLevel, ConfigLoader, ConfigSource, PROJECT_CONFIG_FILE};

use crate::error::{LoopError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default string the agent prints when all work is done.
pub const DEFAULT_COMPLETION_PROMISE: &str = "TASK COMPLETE";

/// Default agent executable.
pub const DEFAULT_MODEL: &str = "claude";

/// Default pause between iterations.
pub const DEFAULT_ITERATION_DELAY: Duration = Duration::from_secs(2);

// ============================================================================
// File Configuration
// ============================================================================

/// Settings read from TOML config files. Every key is optional.
///
/// ```toml
/// max_iterations = 20
/// completion_promise = "ALL STORIES DONE"
/// model = "claude"
/// log_file = "logs/ralph.jsonl"
/// iteration_delay_secs = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub max_iterations: Option<u32>,
    pub completion_promise: Option<String>,
    pub model: Option<String>,
    pub log_file: Option<PathBuf>,
    pub iteration_delay_secs: Option<u64>,
}

// ============================================================================
// Loop Configuration
// ============================================================================

/// Resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Spec file to work through.
    pub spec_path: PathBuf,
    /// Iteration cap; 0 means unbounded.
    pub max_iterations: u32,
    /// Output substring that ends the run successfully.
    pub completion_promise: String,
    /// Agent executable name or path.
    pub model: String,
    /// Optional JSONL telemetry log.
    pub log_file: Option<PathBuf>,
    /// Pause after each iteration.
    pub iteration_delay: Duration,
    /// Directory the agent runs in and the ledger is written to.
    pub working_dir: PathBuf,
}

impl LoopConfig {
    /// Defaults for `spec_path`, working in the current directory.
    #[must_use]
    pub fn new(spec_path: impl Into<PathBuf>) -> Self {
        Self {
            spec_path: spec_path.into(),
            max_iterations: 0,
            completion_promise: DEFAULT_COMPLETION_PROMISE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            log_file: None,
            iteration_delay: DEFAULT_ITERATION_DELAY,
            working_dir: PathBuf::from("."),
        }
    }

    /// Apply every key present in `file`.
    #[must_use]
    pub fn with_file_config(mut self, file: &FileConfig) -> Self {
        if let Some(max) = file.max_iterations {
            self.max_iterations = max;
        }
        if let Some(ref promise) = file.completion_promise {
            self.completion_promise.clone_from(promise);
        }
        if let Some(ref model) = file.model {
            self.model.clone_from(model);
        }
        if let Some(ref log_file) = file.log_file {
            self.log_file = Some(log_file.clone());
        }
        if let Some(secs) = file.iteration_delay_secs {
            self.iteration_delay = Duration::from_secs(secs);
        }
        self
    }

    /// Set the iteration cap (0 = unbounded).
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the completion promise.
    #[must_use]
    pub fn with_completion_promise(mut self, promise: impl Into<String>) -> Self {
        self.completion_promise = promise.into();
        self
    }

    /// Set the agent executable.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Enable JSONL telemetry at `path`.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Set the pause between iterations.
    #[must_use]
    pub fn with_iteration_delay(mut self, delay: Duration) -> Self {
        self.iteration_delay = delay;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Check values that cannot come from the type system.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Config`] if the model or completion promise is empty.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(LoopError::config("model must not be empty"));
        }
        if self.completion_promise.is_empty() {
            return Err(LoopError::config("completion promise must not be empty"));
        }
        Ok(())
    }

    /// Human-readable cap for display.
    #[must_use]
    pub fn max_iterations_display(&self) -> String {
        if self.max_iterations == 0 {
            "unlimited".to_string()
        } else {
            self.max_iterations.to_string()
        }
    }
}
