//! Agent invocation.
//!
//! [`AgentRunner`] wraps an [`AgentProcess`] with telemetry: it records a
//! `command_start` event before launch and a `command_complete` event with
//! the captured output afterwards. Launch and streaming failures surface as
//! [`LoopError::AgentInvocation`].

pub mod claude;

pub use claude::ClaudeAgent;

use crate::error::{LoopError, Result};
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::testing::AgentProcess;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    /// Process exit code; `-1` when killed by a signal.
    pub exit_code: i32,
    /// Merged stdout and stderr, one `\n`-terminated line per output line.
    pub output: String,
    /// Wall-clock time of the invocation.
    pub duration: Duration,
}

impl AgentOutput {
    /// Create an output with zero duration.
    #[must_use]
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
            duration: Duration::ZERO,
        }
    }

    /// Set the measured duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether the agent exited with status 0.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether the output contains `promise` anywhere.
    ///
    /// An empty promise never matches.
    #[must_use]
    pub fn contains_promise(&self, promise: &str) -> bool {
        !promise.is_empty() && self.output.contains(promise)
    }
}

/// Runs the agent and reports each invocation to telemetry.
pub struct AgentRunner {
    process: Arc<dyn AgentProcess>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("command", &self.process.command_line())
            .finish()
    }
}

impl AgentRunner {
    /// Create a runner over `process`.
    #[must_use]
    pub fn new(process: Arc<dyn AgentProcess>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self { process, telemetry }
    }

    /// Invoke the agent once for `iteration`.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::AgentInvocation`] if the process cannot be
    /// launched or its output cannot be read. A nonzero exit code is not an
    /// error.
    pub async fn run(&self, prompt: &str, iteration: u32) -> Result<AgentOutput> {
        let command = self.process.command_line();
        self.telemetry.record(TelemetryEvent::CommandStart {
            command: command.clone(),
            iteration,
        });

        let started = Instant::now();
        match self.process.run(prompt).await {
            Ok(mut out) => {
                if out.duration.is_zero() {
                    out.duration = started.elapsed();
                }
                debug!(
                    "Iteration {} agent finished with code {} in {:?}",
                    iteration, out.exit_code, out.duration
                );
                self.telemetry.record(TelemetryEvent::CommandComplete {
                    command,
                    iteration,
                    exit_code: out.exit_code,
                    duration_ms: duration_ms(out.duration),
                    output: out.output.clone(),
                });
                Ok(out)
            }
            Err(e) => {
                let err = LoopError::agent_invocation(format!("{e:#}"));
                warn!("Iteration {}: {}", iteration, err);
                self.telemetry
                    .record(TelemetryEvent::error(err.kind(), err.to_string(), Some(iteration)));
                Err(err)
            }
        }
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
