//! Markdown task-document specs.
//!
//! Tasks are the `### ` headers inside the `## Step by Step Tasks` section. A
//! task is complete only when the line directly under its header carries the
//! status marker, for example:
//!
//! ```text
//! ### Step 1: Create the database schema
//! **Status:** complete
//! - Create migrations for users table
//! ```

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Header that opens the task section.
pub const TASK_SECTION_HEADER: &str = "## Step by Step Tasks";

/// Literal marker that must appear on the line right after a task header.
pub const STATUS_MARKER: &str = "**Status:**";

/// Token that marks the status line as complete, matched case-insensitively
/// anywhere on the line.
pub const COMPLETE_TOKEN: &str = "complete";

const TASK_PREFIX: &str = "### ";
const SECTION_PREFIX: &str = "## ";

fn section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^## Step by Step Tasks").expect("valid regex"))
}

/// Whether `content` has a line starting with [`TASK_SECTION_HEADER`].
#[must_use]
pub fn has_task_section(content: &str) -> bool {
    section_regex().is_match(content)
}

/// Whether `line` is a completion marker line.
#[must_use]
pub fn is_status_complete_line(line: &str) -> bool {
    line.contains(STATUS_MARKER) && line.to_lowercase().contains(COMPLETE_TOKEN)
}

/// A task header found in the task section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Header text without the `### ` prefix.
    pub title: String,
    /// 1-based line number of the header.
    pub line: usize,
    /// Whether the following line is a completion marker.
    pub complete: bool,
}

/// Parse the task headers of the task section, in document order.
#[must_use]
pub fn parse_tasks(content: &str) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::new();
    let mut in_section = false;
    let mut prev_was_header = false;

    for (idx, line) in content.lines().enumerate() {
        if line.starts_with(TASK_SECTION_HEADER) {
            in_section = true;
            prev_was_header = false;
            continue;
        }

        if !in_section {
            continue;
        }

        if line.starts_with(SECTION_PREFIX) {
            break;
        }

        if let Some(title) = line.strip_prefix(TASK_PREFIX) {
            tasks.push(Task {
                title: title.trim().to_string(),
                line: idx + 1,
                complete: false,
            });
            prev_was_header = true;
        } else if prev_was_header {
            if is_status_complete_line(line) {
                if let Some(task) = tasks.last_mut() {
                    task.complete = true;
                }
            }
            prev_was_header = false;
        }
    }

    tasks
}

/// Count task headers lacking an immediately-following completion marker.
#[must_use]
pub fn count_pending(content: &str) -> usize {
    parse_tasks(content).iter().filter(|t| !t.complete).count()
}
