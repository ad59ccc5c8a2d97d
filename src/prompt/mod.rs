//! Prompt generation for loop iterations.
//!
//! The prompt is fully determined by the spec format, the spec and ledger
//! file names, and the completion promise, so the same inputs always yield
//! the same text.
//!
//! # Example
//!
//! ```
//! use ralph_loop::prompt::PromptBuilder;
//! use ralph_loop::spec::SpecFormat;
//!
//! let builder = PromptBuilder::new("feature.md", "feature-progress.txt", "TASK COMPLETE");
//! let prompt = builder.build(SpecFormat::TaskDoc);
//! assert!(prompt.contains("`feature.md`"));
//! assert!(prompt.contains("TASK COMPLETE"));
//! ```

pub mod templates;

use crate::spec::SpecFormat;
use templates::{Template, TemplateValues, STORY_LIST_TEMPLATE, TASK_DOC_TEMPLATE};

/// Renders the iteration prompt for a spec.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    spec_file: String,
    progress_file: String,
    completion_promise: String,
}

impl PromptBuilder {
    /// Create a builder for the given spec file, ledger file, and promise.
    #[must_use]
    pub fn new(
        spec_file: impl Into<String>,
        progress_file: impl Into<String>,
        completion_promise: impl Into<String>,
    ) -> Self {
        Self {
            spec_file: spec_file.into(),
            progress_file: progress_file.into(),
            completion_promise: completion_promise.into(),
        }
    }

    /// Render the prompt for `format`.
    #[must_use]
    pub fn build(&self, format: SpecFormat) -> String {
        let template = match format {
            SpecFormat::StoryList => Template::new(STORY_LIST_TEMPLATE),
            SpecFormat::TaskDoc => Template::new(TASK_DOC_TEMPLATE),
        };
        template.render(&TemplateValues {
            spec_file: &self.spec_file,
            progress_file: &self.progress_file,
            completion_promise: &self.completion_promise,
        })
    }
}
