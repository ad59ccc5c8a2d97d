//! Append-only progress ledger.
//!
//! The ledger is a plain-text file, `<spec-stem>-progress.txt`, shared by
//! the loop and the agent: the loop appends one marker and one status line
//! per iteration, and the agent appends its own notes in between.

use crate::error::{LoopError, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp format used in the ledger.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time formatted for the ledger.
#[must_use]
pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Handle to a progress ledger file.
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
}

impl ProgressLedger {
    /// Ledger path for `spec_path` inside `dir`.
    #[must_use]
    pub fn path_for(spec_path: &Path, dir: &Path) -> PathBuf {
        dir.join(format!("{}-progress.txt", spec_stem(spec_path)))
    }

    /// Open the ledger for `spec_path` in `dir`, creating it with a header
    /// if it does not exist. An existing ledger is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn ensure_initialized(spec_path: &Path, dir: &Path) -> Result<Self> {
        let path = Self::path_for(spec_path, dir);
        if path.exists() {
            debug!("Reusing progress ledger {}", path.display());
        } else {
            let header = format!(
                "# Progress Log for {}\n# Started: {}\n\n",
                spec_stem(spec_path),
                timestamp()
            );
            std::fs::write(&path, header).map_err(|e| LoopError::ledger(&path, e))?;
            debug!("Created progress ledger {}", path.display());
        }
        Ok(Self { path })
    }

    /// Path of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the ledger, as referenced in the prompt.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Append the header line for an iteration.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be written.
    pub fn append_iteration_marker(&self, iteration: u32, timestamp: &str) -> Result<()> {
        self.append(&format!("\n### Iteration {iteration} - {timestamp}\n"))
    }

    /// Append a `Status:` line.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be written.
    pub fn append_status(&self, status: &str) -> Result<()> {
        self.append(&format!("Status: {status}\n"))
    }

    fn append(&self, text: &str) -> Result<()> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(text.as_bytes()))
            .map_err(|e| LoopError::ledger(&self.path, e))
    }
}

fn spec_stem(spec_path: &Path) -> String {
    spec_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
