//! Structured telemetry event types.
//!
//! Every event is written as one JSON object per line, wrapped in a
//! [`TelemetryRecord`] that adds the timestamp and run id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for telemetry records.
///
/// Increment this when making breaking changes to the event schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Named loop milestones emitted through [`TelemetryEvent::Event`].
pub mod names {
    pub const MAX_ITERATIONS_REACHED: &str = "max_iterations_reached";
    pub const PROMISE_DETECTED: &str = "promise_detected";
    pub const ALL_COMPLETE: &str = "all_complete";
    pub const LOOP_FINISHED: &str = "loop_finished";
    pub const CHANGES_COMMITTED: &str = "changes_committed";
}

/// A telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Resolved run configuration.
    Config {
        spec_file: String,
        format: String,
        max_iterations: u32,
        completion_promise: String,
        model: String,
        iteration_delay_ms: u64,
    },
    /// Agent command about to launch.
    CommandStart { command: String, iteration: u32 },
    /// Agent command finished.
    CommandComplete {
        command: String,
        iteration: u32,
        exit_code: i32,
        duration_ms: u64,
        output: String,
    },
    /// Iteration started.
    IterationStart { iteration: u32, pending: usize },
    /// Iteration ended.
    IterationEnd {
        iteration: u32,
        success: bool,
        duration_ms: u64,
    },
    /// Named milestone with free-form details.
    Event {
        name: String,
        #[serde(default)]
        details: serde_json::Value,
    },
    /// An error, recoverable or not.
    Error {
        kind: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iteration: Option<u32>,
    },
}

impl TelemetryEvent {
    /// Build a named milestone event.
    #[must_use]
    pub fn named(name: &str, details: serde_json::Value) -> Self {
        Self::Event {
            name: name.to_string(),
            details,
        }
    }

    /// Build an error event.
    #[must_use]
    pub fn error(kind: impl Into<String>, message: impl Into<String>, iteration: Option<u32>) -> Self {
        Self::Error {
            kind: kind.into(),
            message: message.into(),
            iteration,
        }
    }

    /// The `event` tag this variant serializes with.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::CommandStart { .. } => "command_start",
            Self::CommandComplete { .. } => "command_complete",
            Self::IterationStart { .. } => "iteration_start",
            Self::IterationEnd { .. } => "iteration_end",
            Self::Event { .. } => "event",
            Self::Error { .. } => "error",
        }
    }
}

/// A telemetry event with its envelope, as written to the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Run identifier shared by every record of one run.
    pub run_id: String,
    /// When the event occurred.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    #[serde(flatten)]
    pub event: TelemetryEvent,
}

impl TelemetryRecord {
    /// Wrap `event` with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, event: TelemetryEvent) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: run_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}
