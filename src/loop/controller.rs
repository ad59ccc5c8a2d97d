//! The iterate-until-done controller.
//!
//! [`LoopController`] wires the spec reader, prompt builder, agent runner,
//! progress ledger, change committer, and telemetry sink into the loop
//! state machine, and owns the exit-code policy.
//!
//! # Dependency Injection
//!
//! External collaborators are passed in through [`LoopDependencies`], so the
//! controller runs unchanged against mocks in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use ralph_loop::config::LoopConfig;
//! use ralph_loop::r#loop::{LoopController, LoopDependencies};
//!
//! let config = LoopConfig::new("prd.json").with_max_iterations(10);
//! let deps = LoopDependencies::real(&config)?;
//! let outcome = LoopController::new(config, deps)?.run().await?;
//! std::process::exit(outcome.exit_code());
//! ```

use super::state::{IterationOutcome, IterationRecord, LoopOutcome, LoopPhase};
use crate::agent::{duration_ms, AgentRunner, ClaudeAgent};
use crate::changes::{ChangeCommitter, CommitResult, RealGitOperations};
use crate::config::LoopConfig;
use crate::error::{LoopError, Result};
use crate::ledger::{self, ProgressLedger};
use crate::prompt::PromptBuilder;
use crate::spec::SpecReader;
use crate::telemetry::{self, names, TelemetryEvent, TelemetrySink};
use crate::testing::{AgentProcess, GitOperations};
use colored::Colorize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

// ============================================================================
// Dependencies
// ============================================================================

/// External collaborators of the loop.
///
/// # Example
///
/// ```rust,ignore
/// use ralph_loop::r#loop::LoopDependencies;
/// use ralph_loop::telemetry::NoopTelemetry;
/// use ralph_loop::testing::{MockAgentProcess, MockGitOperations};
/// use std::sync::Arc;
///
/// let deps = LoopDependencies {
///     agent: Arc::new(MockAgentProcess::new().with_output("TASK COMPLETE")),
///     git: Arc::new(MockGitOperations::new()),
///     telemetry: Arc::new(NoopTelemetry),
/// };
/// ```
pub struct LoopDependencies {
    /// Coding-agent subprocess.
    pub agent: Arc<dyn AgentProcess>,
    /// Version-control client.
    pub git: Arc<dyn GitOperations>,
    /// Structured event sink.
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for LoopDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopDependencies")
            .field("agent", &self.agent.command_line())
            .field("git", &"<dyn GitOperations>")
            .field("telemetry", &"<dyn TelemetrySink>")
            .finish()
    }
}

impl LoopDependencies {
    /// Create real dependencies for production use.
    ///
    /// # Errors
    ///
    /// Returns an error if the telemetry log cannot be opened.
    pub fn real(config: &LoopConfig) -> anyhow::Result<Self> {
        Ok(Self {
            agent: Arc::new(ClaudeAgent::new(
                config.model.clone(),
                config.working_dir.clone(),
            )),
            git: Arc::new(RealGitOperations::new(config.working_dir.clone())),
            telemetry: telemetry::open_sink(config.log_file.as_deref())?,
        })
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Drives the agent through a spec until it is done or capped.
pub struct LoopController {
    config: LoopConfig,
    reader: SpecReader,
    ledger: ProgressLedger,
    prompts: PromptBuilder,
    runner: AgentRunner,
    committer: ChangeCommitter,
    telemetry: Arc<dyn TelemetrySink>,
    phase: LoopPhase,
    iteration: u32,
    promise_detected: bool,
    records: Vec<IterationRecord>,
}

impl std::fmt::Debug for LoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopController")
            .field("spec", &self.reader.path())
            .field("phase", &self.phase)
            .field("iteration", &self.iteration)
            .finish()
    }
}

impl LoopController {
    /// Detect and validate the spec, prepare the ledger, and record the
    /// configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns the spec, config, or ledger error that prevents the loop from
    /// starting. No iteration runs in that case.
    pub fn new(config: LoopConfig, deps: LoopDependencies) -> Result<Self> {
        let telemetry = deps.telemetry;
        let (reader, ledger) = match Self::init(&config) {
            Ok(ready) => ready,
            Err(e) => {
                telemetry.record(TelemetryEvent::error(e.kind(), e.to_string(), None));
                telemetry.close();
                return Err(e);
            }
        };

        telemetry.record(TelemetryEvent::Config {
            spec_file: reader.path().display().to_string(),
            format: reader.format().to_string(),
            max_iterations: config.max_iterations,
            completion_promise: config.completion_promise.clone(),
            model: config.model.clone(),
            iteration_delay_ms: duration_ms(config.iteration_delay),
        });

        let prompts = PromptBuilder::new(
            reader.file_name(),
            ledger.file_name(),
            config.completion_promise.clone(),
        );

        Ok(Self {
            runner: AgentRunner::new(deps.agent, telemetry.clone()),
            committer: ChangeCommitter::new(deps.git),
            config,
            reader,
            ledger,
            prompts,
            telemetry,
            phase: LoopPhase::Init,
            iteration: 0,
            promise_detected: false,
            records: Vec::new(),
        })
    }

    fn init(config: &LoopConfig) -> Result<(SpecReader, ProgressLedger)> {
        config.validate()?;
        let reader = SpecReader::open(&config.spec_path)?;
        let ledger = ProgressLedger::ensure_initialized(reader.path(), &config.working_dir)?;
        debug!(
            "Spec {} detected as {}",
            reader.path().display(),
            reader.format()
        );
        Ok((reader, ledger))
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// The progress ledger for this run.
    #[must_use]
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// The spec being worked.
    #[must_use]
    pub fn reader(&self) -> &SpecReader {
        &self.reader
    }

    /// Run iterations until the spec is done, the promise is seen, or the
    /// cap is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent cannot be invoked, the spec stops
    /// parsing, or the ledger cannot be written. The phase is then `Failed`.
    pub async fn run(&mut self) -> Result<LoopOutcome> {
        self.print_banner();
        self.phase = LoopPhase::Iterating;
        info!(
            "Starting loop on {} ({})",
            self.reader.path().display(),
            self.reader.format()
        );

        if let Err(e) = self.iterate().await {
            return Err(self.fail(e));
        }

        let pending = match self.reader.count_pending() {
            Ok(pending) => pending,
            Err(e) => return Err(self.fail(e)),
        };

        let outcome = LoopOutcome {
            phase: self.phase,
            iterations: self.invocations(),
            pending,
            promise_detected: self.promise_detected,
            records: std::mem::take(&mut self.records),
        };

        self.telemetry.record(TelemetryEvent::named(
            names::LOOP_FINISHED,
            json!({
                "phase": outcome.phase,
                "iterations": outcome.iterations,
                "pending": outcome.pending,
                "promise_detected": outcome.promise_detected,
                "exit_code": outcome.exit_code(),
            }),
        ));
        self.telemetry.close();
        self.print_summary(&outcome);

        Ok(outcome)
    }

    async fn iterate(&mut self) -> Result<()> {
        let max = self.config.max_iterations;
        loop {
            if max > 0 && self.iteration >= max {
                self.phase = LoopPhase::Capped;
                println!(
                    "\n{} Reached max iterations ({})",
                    "Warning:".yellow(),
                    max
                );
                self.telemetry.record(TelemetryEvent::named(
                    names::MAX_ITERATIONS_REACHED,
                    json!({ "max_iterations": max }),
                ));
                return Ok(());
            }

            self.iteration += 1;
            let pending = self.reader.count_pending()?;
            if pending == 0 {
                self.phase = LoopPhase::Done;
                println!(
                    "\n{} All {} complete",
                    "Success:".green().bold(),
                    self.reader.format().unit_name()
                );
                self.telemetry.record(TelemetryEvent::named(
                    names::ALL_COMPLETE,
                    json!({ "iteration": self.iteration }),
                ));
                return Ok(());
            }

            self.run_iteration(pending).await?;
            if self.phase == LoopPhase::Done {
                return Ok(());
            }

            if !self.config.iteration_delay.is_zero() {
                debug!("Pausing {:?} before next iteration", self.config.iteration_delay);
                tokio::time::sleep(self.config.iteration_delay).await;
            }
        }
    }

    async fn run_iteration(&mut self, pending: usize) -> Result<()> {
        let iteration = self.iteration;
        self.print_iteration_header(pending);
        self.telemetry
            .record(TelemetryEvent::IterationStart { iteration, pending });

        let started_at = ledger::timestamp();
        self.ledger.append_iteration_marker(iteration, &started_at)?;
        let prompt = self.prompts.build(self.reader.format());

        let started = Instant::now();
        let output = match self.runner.run(&prompt, iteration).await {
            Ok(output) => output,
            Err(e) => {
                let message = match &e {
                    LoopError::AgentInvocation { message } => message.clone(),
                    other => other.to_string(),
                };
                let outcome = IterationOutcome::Exception { message };
                self.ledger.append_status(&outcome.ledger_status())?;
                self.telemetry.record(TelemetryEvent::IterationEnd {
                    iteration,
                    success: false,
                    duration_ms: duration_ms(started.elapsed()),
                });
                self.records.push(IterationRecord {
                    iteration,
                    started_at,
                    prompt,
                    exit_code: None,
                    output: String::new(),
                    duration: started.elapsed(),
                    outcome,
                });
                return Err(e);
            }
        };

        let outcome = if output.succeeded() {
            IterationOutcome::Completed
        } else {
            IterationOutcome::Failed {
                exit_code: output.exit_code,
            }
        };
        self.ledger.append_status(&outcome.ledger_status())?;

        if outcome.is_success() {
            println!("\n{} Iteration {} completed", "OK".green(), iteration);
            if output.contains_promise(&self.config.completion_promise) {
                self.promise_detected = true;
                self.phase = LoopPhase::Done;
                println!(
                    "{} Completion promise detected: '{}'",
                    "Success:".green().bold(),
                    self.config.completion_promise
                );
                info!("Completion promise detected in iteration {}", iteration);
                self.telemetry.record(TelemetryEvent::named(
                    names::PROMISE_DETECTED,
                    json!({
                        "iteration": iteration,
                        "promise": self.config.completion_promise,
                    }),
                ));
            }
        } else {
            let failure = LoopError::AgentFailure {
                exit_code: output.exit_code,
                iteration,
            };
            warn!("{}", failure);
            println!("\n{} {}", "X".red(), failure);
        }

        self.telemetry.record(TelemetryEvent::IterationEnd {
            iteration,
            success: outcome.is_success(),
            duration_ms: duration_ms(output.duration),
        });

        if let CommitResult::Committed { .. } =
            self.committer.commit_if_dirty(&self.reader.stem(), iteration)
        {
            self.telemetry.record(TelemetryEvent::named(
                names::CHANGES_COMMITTED,
                json!({ "iteration": iteration }),
            ));
        }

        self.records.push(IterationRecord {
            iteration,
            started_at,
            prompt,
            exit_code: Some(output.exit_code),
            duration: output.duration,
            output: output.output,
            outcome,
        });
        Ok(())
    }

    fn fail(&mut self, e: LoopError) -> LoopError {
        self.phase = LoopPhase::Failed;
        // Invocation errors were already recorded by the runner.
        if !matches!(e, LoopError::AgentInvocation { .. }) {
            self.telemetry.record(TelemetryEvent::error(
                e.kind(),
                e.to_string(),
                Some(self.iteration),
            ));
        }
        self.telemetry.record(TelemetryEvent::named(
            names::LOOP_FINISHED,
            json!({
                "phase": self.phase,
                "iterations": self.invocations(),
                "error": e.kind(),
            }),
        ));
        self.telemetry.close();
        e
    }

    fn invocations(&self) -> u32 {
        u32::try_from(self.records.len()).unwrap_or(u32::MAX)
    }

    // ========================================================================
    // Console output
    // ========================================================================

    fn print_banner(&self) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", "     RALPH LOOP - Autonomous Spec Runner".bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("   Spec: {} ({})", self.reader.path().display(), self.reader.format());
        println!("   Progress: {}", self.ledger.path().display());
        println!("   Max iterations: {}", self.config.max_iterations_display());
        println!("   Completion promise: {}", self.config.completion_promise);
        println!("   Agent: {}", self.config.model);
        match self.reader.summary() {
            Ok(summary) => {
                println!(
                    "   Pending: {}/{} {}",
                    summary.pending,
                    summary.total,
                    self.reader.format().unit_name()
                );
                if let Some(next) = summary.next {
                    println!("   Next: {next}");
                }
            }
            Err(e) => debug!("Could not summarise spec: {}", e),
        }
        if let Some(ref log_file) = self.config.log_file {
            println!("   Telemetry: {}", log_file.display());
        }
        println!();
    }

    fn print_iteration_header(&self, pending: usize) {
        println!(
            "\n{} Iteration {}/{} ({} pending {})",
            "===".bright_blue(),
            self.iteration,
            self.config.max_iterations_display(),
            pending,
            self.reader.format().unit_name()
        );
    }

    fn print_summary(&self, outcome: &LoopOutcome) {
        println!();
        println!("{}", "=".repeat(60).bright_blue());
        println!("   Finished: {}", outcome.phase);
        println!("   Iterations run: {}", outcome.iterations);
        println!(
            "   Pending {}: {}",
            self.reader.format().unit_name(),
            outcome.pending
        );
        if outcome.is_success() {
            println!("   {}", "All work complete".green().bold());
        } else {
            println!("   {}", "Work remains".yellow().bold());
        }
        println!("{}", "=".repeat(60).bright_blue());
    }
}
