//! JSON Lines telemetry sink.

use super::{TelemetryEvent, TelemetryRecord, TelemetrySink};
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Appends one JSON record per line to a log file.
///
/// Each record is flushed as soon as it is written so a crashed run still
/// leaves a complete trail up to the failure.
#[derive(Debug)]
pub struct JsonlTelemetry {
    path: PathBuf,
    run_id: String,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl JsonlTelemetry {
    /// Create (or append to) the log at `path` with a fresh run id.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_run_id(path, uuid::Uuid::new_v4().to_string())
    }

    /// Create the log with an explicit run id.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or the file cannot be created.
    pub fn with_run_id(path: impl AsRef<Path>, run_id: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;

        Ok(Self {
            path,
            run_id: run_id.into(),
            writer: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run id stamped on every record.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn write_record(&self, record: &TelemetryRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("telemetry writer lock poisoned"))?;
        if let Some(writer) = guard.as_mut() {
            writeln!(writer, "{line}")?;
            writer.flush()?;
        }
        Ok(())
    }
}

impl TelemetrySink for JsonlTelemetry {
    fn record(&self, event: TelemetryEvent) {
        let record = TelemetryRecord::new(self.run_id.clone(), event);
        if let Err(e) = self.write_record(&record) {
            warn!("Failed to write telemetry to {}: {}", self.path.display(), e);
        }
    }

    fn close(&self) {
        if let Ok(mut guard) = self.writer.lock() {
            if let Some(mut writer) = guard.take() {
                if let Err(e) = writer.flush() {
                    warn!("Failed to flush telemetry log: {}", e);
                }
            }
        }
    }
}
