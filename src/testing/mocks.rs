//! Mock implementations of testing traits.
//!
//! These mocks provide controllable test doubles for external dependencies,
//! enabling deterministic unit tests.

use super::traits::{AgentProcess, GitOperations};
use crate::agent::AgentOutput;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Mock implementation of git operations.
///
/// # Example
///
/// ```rust,ignore
/// let git = MockGitOperations::new().with_dirty_worktree();
///
/// assert!(git.has_uncommitted_changes().unwrap());
/// git.commit("msg").unwrap();
/// assert_eq!(git.commit_messages(), vec!["msg"]);
/// ```
#[derive(Debug, Default)]
pub struct MockGitOperations {
    dirty: bool,
    status_error: Option<String>,
    commit_error: Option<String>,
    stage_calls: AtomicU32,
    commits: Mutex<Vec<String>>,
}

impl MockGitOperations {
    /// Create a new mock with a clean worktree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report uncommitted changes on every status check.
    #[must_use]
    pub fn with_dirty_worktree(mut self) -> Self {
        self.dirty = true;
        self
    }

    /// Make the status check fail, as outside a repository.
    #[must_use]
    pub fn with_status_error(mut self, error: &str) -> Self {
        self.status_error = Some(error.to_string());
        self
    }

    /// Make every commit fail with an error.
    #[must_use]
    pub fn with_commit_error(mut self, error: &str) -> Self {
        self.commit_error = Some(error.to_string());
        self
    }

    /// Messages of the commits made so far.
    pub fn commit_messages(&self) -> Vec<String> {
        self.commits.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of times `stage_all` was called.
    pub fn stage_calls(&self) -> u32 {
        self.stage_calls.load(Ordering::SeqCst)
    }
}

impl GitOperations for MockGitOperations {
    fn has_uncommitted_changes(&self) -> Result<bool> {
        if let Some(ref error) = self.status_error {
            bail!("{}", error)
        }
        Ok(self.dirty)
    }

    fn stage_all(&self) -> Result<()> {
        self.stage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        if let Some(ref error) = self.commit_error {
            bail!("{}", error)
        }
        if let Ok(mut commits) = self.commits.lock() {
            commits.push(message.to_string());
        }
        Ok(())
    }
}

/// One scripted reply from [`MockAgentProcess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Exit with `code` after printing `output`.
    Exit { code: i32, output: String },
    /// Fail to launch with `message`.
    Error(String),
}

type CallHook = Arc<dyn Fn(u32) + Send + Sync>;

/// Mock implementation of the agent process.
///
/// Replies are taken from a script in order; once the script is exhausted
/// every call gets the default reply. Thread-safe for use in async contexts.
///
/// # Example
///
/// ```rust,ignore
/// let agent = MockAgentProcess::new()
///     .then_exit(1, "build broke")
///     .then_exit(0, "TASK COMPLETE");
///
/// assert_eq!(agent.run("prompt").await.unwrap().exit_code, 1);
/// ```
pub struct MockAgentProcess {
    default: MockResponse,
    script: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicU32,
    on_call: Option<CallHook>,
}

impl std::fmt::Debug for MockAgentProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAgentProcess")
            .field("default", &self.default)
            .field("call_count", &self.call_count())
            .field("on_call", &self.on_call.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Default for MockAgentProcess {
    fn default() -> Self {
        Self {
            default: MockResponse::Exit {
                code: 0,
                output: String::new(),
            },
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
            on_call: None,
        }
    }
}

impl MockAgentProcess {
    /// Create a new mock that exits 0 with no output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exit code of the default reply.
    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        let output = match self.default {
            MockResponse::Exit { output, .. } => output,
            MockResponse::Error(_) => String::new(),
        };
        self.default = MockResponse::Exit { code, output };
        self
    }

    /// Set the output of the default reply.
    #[must_use]
    pub fn with_output(mut self, output: &str) -> Self {
        let code = match self.default {
            MockResponse::Exit { code, .. } => code,
            MockResponse::Error(_) => 0,
        };
        self.default = MockResponse::Exit {
            code,
            output: output.to_string(),
        };
        self
    }

    /// Make the default reply a launch error.
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.default = MockResponse::Error(error.to_string());
        self
    }

    /// Queue a scripted exit.
    #[must_use]
    pub fn then_exit(self, code: i32, output: &str) -> Self {
        self.push(MockResponse::Exit {
            code,
            output: output.to_string(),
        })
    }

    /// Queue a scripted launch error.
    #[must_use]
    pub fn then_error(self, error: &str) -> Self {
        self.push(MockResponse::Error(error.to_string()))
    }

    /// Run `hook` with the 1-based call number before each reply.
    ///
    /// Tests use this to edit the spec file the way a real agent would.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Arc::new(hook));
        self
    }

    /// Get the number of times `run` was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(self, response: MockResponse) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
        self
    }

    fn next_response(&self) -> MockResponse {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl AgentProcess for MockAgentProcess {
    fn command_line(&self) -> String {
        "mock-agent --dangerously-skip-permissions --verbose -p <prompt>".to_string()
    }

    async fn run(&self, prompt: &str) -> Result<AgentOutput> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(ref hook) = self.on_call {
            hook(call);
        }

        match self.next_response() {
            MockResponse::Exit { code, output } => Ok(AgentOutput::new(code, output)),
            MockResponse::Error(error) => bail!("{}", error),
        }
    }
}

/// Telemetry sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
    closed: AtomicU32,
}

impl RecordingTelemetry {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// The `event` tag of every recorded event, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(TelemetryEvent::kind).collect()
    }

    /// Names of the recorded milestone events, in order.
    pub fn milestone_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TelemetryEvent::Event { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) > 0
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
