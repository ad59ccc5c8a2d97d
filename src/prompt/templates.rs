//! Iteration prompt templates and marker substitution.
//!
//! Each spec format has one built-in template. Templates carry `{{MARKER}}`
//! placeholders that [`Template::render`] replaces with per-run values.
//!
//! # Example
//!
//! ```
//! use ralph_loop::prompt::templates::{Template, TemplateMarker};
//!
//! let template = Template::new("Read {{SPEC_FILE}} now");
//! assert!(template.has_marker(TemplateMarker::SpecFile));
//! ```

use serde::Serialize;

/// Template variable markers that can be substituted in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateMarker {
    /// File name of the spec being worked.
    SpecFile,
    /// File name of the progress ledger.
    ProgressFile,
    /// Literal string the agent prints once all work is done.
    CompletionPromise,
}

impl TemplateMarker {
    /// Get the template tag string for this marker.
    ///
    /// # Example
    ///
    /// ```
    /// use ralph_loop::prompt::templates::TemplateMarker;
    ///
    /// assert_eq!(TemplateMarker::SpecFile.tag(), "{{SPEC_FILE}}");
    /// ```
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            TemplateMarker::SpecFile => "{{SPEC_FILE}}",
            TemplateMarker::ProgressFile => "{{PROGRESS_FILE}}",
            TemplateMarker::CompletionPromise => "{{COMPLETION_PROMISE}}",
        }
    }

    /// Get all available markers.
    #[must_use]
    pub fn all() -> &'static [TemplateMarker] {
        &[
            TemplateMarker::SpecFile,
            TemplateMarker::ProgressFile,
            TemplateMarker::CompletionPromise,
        ]
    }
}

impl std::fmt::Display for TemplateMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub spec_file: &'a str,
    pub progress_file: &'a str,
    pub completion_promise: &'a str,
}

impl TemplateValues<'_> {
    fn value_for(&self, marker: TemplateMarker) -> &str {
        match marker {
            TemplateMarker::SpecFile => self.spec_file,
            TemplateMarker::ProgressFile => self.progress_file,
            TemplateMarker::CompletionPromise => self.completion_promise,
        }
    }
}

/// A template with its content and detected markers.
#[derive(Debug, Clone)]
pub struct Template {
    content: String,
    markers: Vec<TemplateMarker>,
}

impl Template {
    /// Create a new template from content, detecting its markers.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let markers = TemplateMarker::all()
            .iter()
            .copied()
            .filter(|m| content.contains(m.tag()))
            .collect();
        Self { content, markers }
    }

    /// Check if this template has a specific marker.
    #[must_use]
    pub fn has_marker(&self, marker: TemplateMarker) -> bool {
        self.markers.contains(&marker)
    }

    /// Substitute every marker with its value.
    ///
    /// Substitution is single-pass over the template text, so values that
    /// happen to contain marker tags are inserted verbatim.
    #[must_use]
    pub fn render(&self, values: &TemplateValues<'_>) -> String {
        let mut out = String::with_capacity(self.content.len() + 128);
        let mut rest = self.content.as_str();

        'outer: while !rest.is_empty() {
            if let Some(start) = rest.find("{{") {
                out.push_str(&rest[..start]);
                let candidate = &rest[start..];
                for marker in &self.markers {
                    if candidate.starts_with(marker.tag()) {
                        out.push_str(values.value_for(*marker));
                        rest = &candidate[marker.tag().len()..];
                        continue 'outer;
                    }
                }
                out.push_str("{{");
                rest = &candidate[2..];
            } else {
                out.push_str(rest);
                break;
            }
        }

        out
    }
}

/// Built-in template for JSON story-list specs.
pub const STORY_LIST_TEMPLATE: &str = r#"# Ralph Wiggum Loop - Iteration Prompt

You are an autonomous coding agent working through a spec until every story is complete.

## Your Task

1. Read `{{SPEC_FILE}}` to see the stories and their current status
2. Read `{{PROGRESS_FILE}}` to see what earlier iterations did and learned
3. Choose the highest-priority incomplete story that is not blocked
4. Implement that story completely
5. Edit `{{SPEC_FILE}}` and set `"status": "complete"` on the story you finished
6. Append what you did and learned to `{{PROGRESS_FILE}}`

## Rules

- **One story per iteration**: finish a single story before starting another
- **Update the spec**: a finished story must have `"status": "complete"`
- **Keep the progress log**: record what changed, problems hit, and learnings
- **Stay in scope**: only work on stories from this spec
- **Completion promise**: once every story is complete, output exactly: `{{COMPLETION_PROMISE}}`

## Story Priority

1. All P0 stories first
2. Then P1 stories
3. Then P2 stories
4. Honour `blocked_by`: never start a story while any story it lists is incomplete

## Before Marking a Story Complete

- Every acceptance criterion is met
- The code builds and lints cleanly
- The implementation has no obvious errors

## Begin

Read `{{SPEC_FILE}}` and `{{PROGRESS_FILE}}` now, then implement the next incomplete story."#;

/// Built-in template for Markdown task-document specs.
pub const TASK_DOC_TEMPLATE: &str = r#"# Ralph Wiggum Loop - Iteration Prompt

You are an autonomous coding agent working through a feature spec until every task is complete.

## Your Task

1. Read `{{SPEC_FILE}}` to understand the feature and its Step by Step Tasks
2. Read `{{PROGRESS_FILE}}` to see what earlier iterations did and learned
3. Find the first task whose heading is not immediately followed by `**Status:** complete`
4. Implement that task completely
5. Edit `{{SPEC_FILE}}` and insert the line `**Status:** complete` directly after that task's h3 heading
6. Append what you did and learned to `{{PROGRESS_FILE}}`

## Rules

- **One task per iteration**: finish a single task before starting another
- **Strict order**: work through the tasks from top to bottom exactly as listed
- **Mark completion**: the line right after the h3 heading must be `**Status:** complete`
- **Keep the progress log**: record what changed, problems hit, and learnings
- **Stay in scope**: only work on tasks from this spec
- **Completion promise**: once every task is complete, output exactly: `{{COMPLETION_PROMISE}}`

## Task Status Format

An incomplete task:
```
### Step 1: Create the database schema
- Create migrations for users table
- Add indexes
```

The same task once complete:
```
### Step 1: Create the database schema
**Status:** complete
- Create migrations for users table
- Add indexes
```

## Before Marking a Task Complete

- Every bullet under the task is done
- The code builds and lints cleanly
- The implementation has no obvious errors

## Begin

Read `{{SPEC_FILE}}` and `{{PROGRESS_FILE}}` now, then implement the next incomplete task."#;

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> TemplateValues<'static> {
        TemplateValues {
            spec_file: "feature.md",
            progress_file: "feature-progress.txt",
            completion_promise: "ALL DONE",
        }
    }

    #[test]
    fn test_marker_detection() {
        let template = Template::new("{{SPEC_FILE}} and {{PROGRESS_FILE}}");
        assert!(template.has_marker(TemplateMarker::SpecFile));
        assert!(template.has_marker(TemplateMarker::ProgressFile));
        assert!(!template.has_marker(TemplateMarker::CompletionPromise));
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = Template::new("{{SPEC_FILE}} / {{SPEC_FILE}} / {{COMPLETION_PROMISE}}");
        assert_eq!(
            template.render(&values()),
            "feature.md / feature.md / ALL DONE"
        );
    }

    #[test]
    fn test_render_leaves_unknown_braces() {
        let template = Template::new("{{UNKNOWN}} {{SPEC_FILE}}");
        assert_eq!(template.render(&values()), "{{UNKNOWN}} feature.md");
    }

    #[test]
    fn test_render_does_not_expand_markers_inside_values() {
        let template = Template::new("{{COMPLETION_PROMISE}}");
        let vals = TemplateValues {
            completion_promise: "{{SPEC_FILE}}",
            ..values()
        };
        assert_eq!(template.render(&vals), "{{SPEC_FILE}}");
    }

    #[test]
    fn test_builtin_templates_use_all_markers() {
        for content in [STORY_LIST_TEMPLATE, TASK_DOC_TEMPLATE] {
            let template = Template::new(content);
            for marker in TemplateMarker::all() {
                assert!(template.has_marker(*marker), "missing {marker}");
            }
        }
    }
}
