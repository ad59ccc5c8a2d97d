//! Spec format detection, validation, and pending-work counting.
//!
//! Two incompatible spec shapes are supported:
//!
//! - [`SpecFormat::StoryList`] - a JSON document with a top-level `stories` array
//! - [`SpecFormat::TaskDoc`] - a Markdown document with a `## Step by Step Tasks`
//!   section whose `###` headers are the tasks
//!
//! The spec is owned by the agent: everything here is read-only and every
//! call re-reads the file, so edits made by the agent between iterations are
//! always observed.
//!
//! # Example
//!
//! ```rust,ignore
//! use ralph_loop::spec::SpecReader;
//!
//! let reader = SpecReader::open("specs/feature.md")?;
//! println!("{} pending", reader.count_pending()?);
//! ```

pub mod story_list;
pub mod task_doc;

pub use story_list::{next_story, Priority, Story, COMPLETED_STATUSES};
pub use task_doc::{Task, TASK_SECTION_HEADER};

use crate::error::{LoopError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The two supported spec shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecFormat {
    /// JSON document with a `stories` array.
    StoryList,
    /// Markdown document with a `## Step by Step Tasks` section.
    TaskDoc,
}

impl std::fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecFormat::StoryList => write!(f, "json"),
            SpecFormat::TaskDoc => write!(f, "markdown"),
        }
    }
}

impl SpecFormat {
    /// What a single unit of work is called in this format.
    #[must_use]
    pub fn unit_name(&self) -> &'static str {
        match self {
            SpecFormat::StoryList => "stories",
            SpecFormat::TaskDoc => "tasks",
        }
    }
}

/// Detect the spec format of `path`.
///
/// The extension decides first (`.json` and `.md`, case-insensitive) without
/// touching the file, so a malformed `.json` file is still a story list and
/// its problems surface in [`validate`]. Other extensions fall back to
/// sniffing the content.
///
/// # Errors
///
/// Returns [`LoopError::FormatUndetectable`] when neither the extension nor
/// the content matches, or an IO error if the content cannot be read.
pub fn detect_format(path: &Path) -> Result<SpecFormat> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => return Ok(SpecFormat::StoryList),
        Some("md") => return Ok(SpecFormat::TaskDoc),
        _ => {}
    }

    let content = std::fs::read_to_string(path)?;

    if story_list::looks_like_story_list(&content) {
        return Ok(SpecFormat::StoryList);
    }
    if task_doc::has_task_section(&content) {
        return Ok(SpecFormat::TaskDoc);
    }

    Err(LoopError::FormatUndetectable {
        path: path.to_path_buf(),
    })
}

/// Validate the structure of the spec at `path` for the given format.
///
/// # Errors
///
/// Returns [`LoopError::InvalidSpec`] describing the structural problem, or
/// an IO error if the file cannot be read.
pub fn validate(path: &Path, format: SpecFormat) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    match format {
        SpecFormat::StoryList => story_list::parse_stories(&content, path).map(|_| ()),
        SpecFormat::TaskDoc => {
            if task_doc::has_task_section(&content) {
                Ok(())
            } else {
                Err(LoopError::invalid_spec(
                    format!(
                        "Markdown spec must have '{}' section: {}",
                        TASK_SECTION_HEADER,
                        path.display()
                    ),
                    path,
                ))
            }
        }
    }
}

/// Count incomplete work units in the spec at `path`.
///
/// # Errors
///
/// Returns [`LoopError::InvalidSpec`] if a story list no longer parses, or an
/// IO error if the file cannot be read.
pub fn count_pending(path: &Path, format: SpecFormat) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    match format {
        SpecFormat::StoryList => {
            let stories = story_list::parse_stories(&content, path)?;
            Ok(story_list::count_pending(&stories))
        }
        SpecFormat::TaskDoc => Ok(task_doc::count_pending(&content)),
    }
}

/// Snapshot of a spec's progress, used by the `status` command and the banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecSummary {
    /// Detected format.
    pub format: SpecFormat,
    /// Total number of work units.
    pub total: usize,
    /// Number of incomplete work units.
    pub pending: usize,
    /// Label of the unit the agent is expected to pick next, if any.
    pub next: Option<String>,
}

impl SpecSummary {
    /// Whether every work unit is complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

/// A spec file bound to its detected and validated format.
#[derive(Debug, Clone)]
pub struct SpecReader {
    path: PathBuf,
    format: SpecFormat,
}

impl SpecReader {
    /// Detect and validate the spec at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::SpecNotFound`] if the path is not a file, or any
    /// error from [`detect_format`] and [`validate`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(LoopError::SpecNotFound { path });
        }
        let format = detect_format(&path)?;
        validate(&path, format)?;
        Ok(Self { path, format })
    }

    /// Path to the spec file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected format.
    #[must_use]
    pub fn format(&self) -> SpecFormat {
        self.format
    }

    /// File name of the spec (e.g. `feature.md`).
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Base name of the spec without extension (e.g. `feature`).
    #[must_use]
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Count incomplete work units, re-reading the file.
    ///
    /// # Errors
    ///
    /// See [`count_pending`].
    pub fn count_pending(&self) -> Result<usize> {
        count_pending(&self.path, self.format)
    }

    /// Build a progress summary, re-reading the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or no longer parses.
    pub fn summary(&self) -> Result<SpecSummary> {
        let content = std::fs::read_to_string(&self.path)?;
        let summary = match self.format {
            SpecFormat::StoryList => {
                let stories = story_list::parse_stories(&content, &self.path)?;
                SpecSummary {
                    format: self.format,
                    total: stories.len(),
                    pending: story_list::count_pending(&stories),
                    next: next_story(&stories).map(Story::label),
                }
            }
            SpecFormat::TaskDoc => {
                let tasks = task_doc::parse_tasks(&content);
                SpecSummary {
                    format: self.format,
                    total: tasks.len(),
                    pending: task_doc::count_pending(&content),
                    next: tasks
                        .iter()
                        .find(|t| !t.complete)
                        .map(|t| t.title.clone()),
                }
            }
        };
        Ok(summary)
    }
}
