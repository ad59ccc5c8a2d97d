//! Test fixtures for creating reproducible spec workspaces.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary working directory holding one spec file.
///
/// Automatically cleans up when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = SpecFixture::story_list(&["complete", "todo"]);
/// assert_eq!(fixture.spec_path().file_name().unwrap(), "prd.json");
/// ```
pub struct SpecFixture {
    temp_dir: TempDir,
    spec_path: PathBuf,
}

impl SpecFixture {
    /// A `prd.json` story list with one story per status.
    ///
    /// # Panics
    ///
    /// Panics if the fixture cannot be written.
    #[must_use]
    pub fn story_list(statuses: &[&str]) -> Self {
        Self::with_file("prd.json", &Self::story_list_content(statuses))
    }

    /// A `feature.md` task doc with one task per flag; `true` marks it complete.
    ///
    /// # Panics
    ///
    /// Panics if the fixture cannot be written.
    #[must_use]
    pub fn task_doc(completed: &[bool]) -> Self {
        Self::with_file("feature.md", &Self::task_doc_content(completed))
    }

    /// A spec file with arbitrary name and content.
    ///
    /// # Panics
    ///
    /// Panics if the fixture cannot be written.
    #[must_use]
    pub fn with_file(name: &str, content: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let spec_path = temp_dir.path().join(name);
        std::fs::write(&spec_path, content).expect("Failed to write spec fixture");
        Self {
            temp_dir,
            spec_path,
        }
    }

    /// Working directory of the fixture.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the spec file.
    #[must_use]
    pub fn spec_path(&self) -> &Path {
        &self.spec_path
    }

    /// Read a file relative to the fixture directory.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(name)).expect("Failed to read file")
    }

    /// JSON content for a story list with the given statuses.
    #[must_use]
    pub fn story_list_content(statuses: &[&str]) -> String {
        let stories: Vec<serde_json::Value> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                serde_json::json!({
                    "id": format!("S{}", i + 1),
                    "title": format!("Story {}", i + 1),
                    "status": status,
                })
            })
            .collect();
        serde_json::json!({ "stories": stories }).to_string()
    }

    /// Markdown content for a task doc with the given completion flags.
    #[must_use]
    pub fn task_doc_content(completed: &[bool]) -> String {
        let mut content = String::from("# Feature\n\n## Step by Step Tasks\n\n");
        for (i, done) in completed.iter().enumerate() {
            content.push_str(&format!("### Step {}: Task {}\n", i + 1, i + 1));
            if *done {
                content.push_str("**Status:** complete\n");
            }
            content.push_str("- do the thing\n\n");
        }
        content.push_str("## Notes\n\nNothing else.\n");
        content
    }
}
