//! Optional structured telemetry for loop runs.
//!
//! Components receive a [`TelemetrySink`] and record events unconditionally;
//! when telemetry is disabled the sink is a [`NoopTelemetry`], so call sites
//! never branch on whether logging is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use ralph_loop::telemetry::{JsonlTelemetry, TelemetryEvent, TelemetrySink};
//!
//! let sink = JsonlTelemetry::create("/tmp/ralph.log")?;
//! sink.record(TelemetryEvent::IterationStart { iteration: 1, pending: 3 });
//! sink.close();
//! ```

pub mod events;
pub mod jsonl;

pub use events::{names, TelemetryEvent, TelemetryRecord, SCHEMA_VERSION};
pub use jsonl::JsonlTelemetry;

use std::path::Path;
use std::sync::Arc;

/// Destination for telemetry events.
///
/// Recording never fails from the caller's point of view: sinks report their
/// own write errors through `tracing` and keep going.
pub trait TelemetrySink: Send + Sync {
    /// Record one event.
    fn record(&self, event: TelemetryEvent);

    /// Flush and release the sink. Further events may be dropped.
    fn close(&self) {}
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Open the sink for an optional log path.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn open_sink(log_file: Option<&Path>) -> anyhow::Result<Arc<dyn TelemetrySink>> {
    match log_file {
        Some(path) => Ok(Arc::new(JsonlTelemetry::create(path)?)),
        None => Ok(Arc::new(NoopTelemetry)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_noop_accepts_events() {
        let sink = NoopTelemetry;
        sink.record(TelemetryEvent::named(names::ALL_COMPLETE, serde_json::json!({})));
        sink.close();
    }

    #[test]
    fn test_open_sink_without_path_is_noop() {
        let sink = open_sink(None).unwrap();
        sink.record(TelemetryEvent::IterationStart {
            iteration: 1,
            pending: 1,
        });
    }

    #[test]
    fn test_open_sink_with_path_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        let sink = open_sink(Some(&path)).unwrap();
        sink.record(TelemetryEvent::IterationStart {
            iteration: 1,
            pending: 1,
        });
        sink.close();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("iteration_start"));
    }
}
