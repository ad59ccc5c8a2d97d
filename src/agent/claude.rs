//! Real coding-agent subprocess.
//!
//! Runs the agent CLI in non-interactive mode with stderr and stdout sharing
//! one pipe, then tees that stream: every line is echoed to our stdout as it
//! arrives, written to a scratch capture file, and collected into the
//! returned output.

use super::AgentOutput;
use crate::testing::AgentProcess;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// Flags passed before the prompt on every invocation.
pub const AGENT_FLAGS: &[&str] = &["--dangerously-skip-permissions", "--verbose", "-p"];

/// Agent CLI launched as a subprocess.
#[derive(Debug, Clone)]
pub struct ClaudeAgent {
    program: String,
    working_dir: PathBuf,
    echo: bool,
}

impl ClaudeAgent {
    /// Create an agent that runs `program` in `working_dir`.
    #[must_use]
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            echo: true,
        }
    }

    /// Disable echoing agent output to stdout.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// The configured program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn resolve_program(&self) -> Result<PathBuf> {
        which::which(&self.program)
            .with_context(|| format!("Agent executable '{}' not found in PATH", self.program))
    }
}

/// Tee newline-delimited output from `reader` until EOF.
///
/// Each line is echoed to stdout (when `echo` is set), written to a scratch
/// capture file, and appended to the returned string. Invalid UTF-8 is
/// replaced and a trailing `\r` is dropped.
fn tee_lines(reader: impl Read, echo: bool) -> Result<String> {
    let mut capture =
        tempfile::NamedTempFile::new().context("Failed to create agent capture file")?;
    let mut output = String::new();

    for segment in BufReader::new(reader).split(b'\n') {
        let bytes = segment.context("Failed to read agent output")?;
        let text = String::from_utf8_lossy(&bytes);
        let line = text.strip_suffix('\r').unwrap_or(&text);
        if echo {
            println!("{line}");
        }
        writeln!(capture, "{line}").context("Failed to write agent capture file")?;
        output.push_str(line);
        output.push('\n');
    }

    Ok(output)
}

#[async_trait]
impl AgentProcess for ClaudeAgent {
    fn command_line(&self) -> String {
        format!("{} {} <prompt>", self.program, AGENT_FLAGS.join(" "))
    }

    async fn run(&self, prompt: &str) -> Result<AgentOutput> {
        let program = self.resolve_program()?;
        debug!("Launching agent: {}", program.display());

        // One pipe for both streams, same as `2>&1`.
        let (reader, writer) = os_pipe::pipe().context("Failed to create agent output pipe")?;
        let stderr_writer = writer
            .try_clone()
            .context("Failed to duplicate agent output pipe")?;

        let started = Instant::now();
        let mut command = Command::new(&program);
        command
            .args(AGENT_FLAGS)
            .arg(prompt)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);
        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn agent: {}", program.display()))?;
        // The builder holds our copies of the write end; drop them so the
        // reader sees EOF when the agent exits.
        drop(command);

        let echo = self.echo;
        let output = tokio::task::spawn_blocking(move || tee_lines(reader, echo))
            .await
            .context("Agent output reader panicked")??;

        let status = child.wait().await.context("Failed to wait for agent")?;
        let exit_code = status.code().unwrap_or(-1);
        debug!("Agent exited with code {} ({} bytes of output)", exit_code, output.len());

        Ok(AgentOutput::new(exit_code, output).with_duration(started.elapsed()))
    }
}
