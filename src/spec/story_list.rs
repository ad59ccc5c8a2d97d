//! JSON story-list specs.
//!
//! Stories are read leniently from a `serde_json::Value` so that fields the
//! agent writes in an unexpected shape (a numeric id, a missing status)
//! degrade to "pending" instead of failing the run.

use crate::error::{LoopError, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Normalized status values that mark a story as complete.
///
/// Statuses are trimmed and lowercased before being compared against this set.
pub const COMPLETED_STATUSES: &[&str] = &["complete", "done"];

/// Story priority tier. Lower tiers are worked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl Priority {
    /// Parse a priority tag such as `"P0"` or `"p1"`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "P0" => Some(Self::P0),
            "P1" => Some(Self::P1),
            "P2" => Some(Self::P2),
            _ => None,
        }
    }
}

/// A single story from a story-list spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Story {
    /// Story identifier, stringified if the spec uses numbers.
    pub id: Option<String>,
    /// Human-readable title.
    pub title: Option<String>,
    /// Raw status string as written in the spec.
    pub status: String,
    /// Priority tier, if declared.
    pub priority: Option<Priority>,
    /// Ids of stories that must be complete first.
    pub blocked_by: Vec<String>,
}

impl Story {
    /// Build a story from its JSON value.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let id = value.get("id").and_then(scalar_to_string);
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let priority = value
            .get("priority")
            .and_then(Value::as_str)
            .and_then(Priority::parse);
        let blocked_by = match value.get("blocked_by") {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other).into_iter().collect(),
            None => Vec::new(),
        };

        Self {
            id,
            title,
            status,
            priority,
            blocked_by,
        }
    }

    /// Whether the story's status is one of [`COMPLETED_STATUSES`].
    #[must_use]
    pub fn is_complete(&self) -> bool {
        is_completed_status(&self.status)
    }

    /// Short display label (`id: title`, or whichever is present).
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.id, &self.title) {
            (Some(id), Some(title)) => format!("{id}: {title}"),
            (Some(id), None) => id.clone(),
            (None, Some(title)) => title.clone(),
            (None, None) => "(untitled story)".to_string(),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Check a raw status string against [`COMPLETED_STATUSES`].
#[must_use]
pub fn is_completed_status(status: &str) -> bool {
    let normalized = status.trim().to_lowercase();
    COMPLETED_STATUSES.contains(&normalized.as_str())
}

/// Whether `content` parses as a JSON object with a `stories` key.
pub(crate) fn looks_like_story_list(content: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(content),
        Ok(Value::Object(map)) if map.contains_key("stories")
    )
}

/// Parse and structurally validate a story-list document.
///
/// # Errors
///
/// Returns [`LoopError::InvalidSpec`] for malformed JSON, a non-object
/// document, a missing `stories` field, or a `stories` field that is not an
/// array. Each case has its own message.
pub fn parse_stories(content: &str, path: &Path) -> Result<Vec<Story>> {
    let data: Value = serde_json::from_str(content)
        .map_err(|e| LoopError::invalid_spec(format!("Invalid JSON in spec file: {e}"), path))?;

    let Value::Object(map) = data else {
        return Err(LoopError::invalid_spec(
            "JSON spec must be an object with a 'stories' array",
            path,
        ));
    };

    match map.get("stories") {
        None => Err(LoopError::invalid_spec(
            "JSON spec must have a 'stories' array",
            path,
        )),
        Some(Value::Array(items)) => Ok(items.iter().map(Story::from_value).collect()),
        Some(_) => Err(LoopError::invalid_spec("'stories' must be an array", path)),
    }
}

/// Count stories that are not complete.
#[must_use]
pub fn count_pending(stories: &[Story]) -> usize {
    stories.iter().filter(|s| !s.is_complete()).count()
}

/// Select the story the agent should work on next.
///
/// Picks the highest-priority incomplete story whose `blocked_by` entries all
/// name complete stories. Unprioritised stories rank after P2; ties keep
/// document order. Dependencies on ids that do not exist are ignored.
///
/// The loop only displays this choice; the agent makes the real one.
#[must_use]
pub fn next_story(stories: &[Story]) -> Option<&Story> {
    let is_blocked = |story: &Story| {
        story.blocked_by.iter().any(|dep| {
            stories
                .iter()
                .any(|other| other.id.as_deref() == Some(dep.as_str()) && !other.is_complete())
        })
    };

    stories
        .iter()
        .filter(|s| !s.is_complete() && !is_blocked(s))
        .min_by_key(|s| s.priority.map_or(u8::MAX, |p| p as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn story(value: Value) -> Story {
        Story::from_value(&value)
    }

    #[test]
    fn test_completed_status_normalization() {
        for status in ["complete", "Complete", "COMPLETE", "done", " Done ", "DONE"] {
            assert!(is_completed_status(status), "{status:?} should be complete");
        }
        for status in ["", "todo", "in progress", "completed?", "not done", "incomplete"] {
            assert!(!is_completed_status(status), "{status:?} should be pending");
        }
    }

    #[test]
    fn test_count_pending() {
        let stories = vec![
            story(json!({"status": "Complete"})),
            story(json!({"status": "COMPLETE"})),
            story(json!({"status": "done"})),
            story(json!({"status": ""})),
            story(json!({"status": "in_progress"})),
            story(json!({})),
        ];
        assert_eq!(count_pending(&stories), 3);
    }

    #[test]
    fn test_non_string_status_is_pending() {
        let s = story(json!({"status": true}));
        assert_eq!(s.status, "");
        assert!(!s.is_complete());
    }

    #[test]
    fn test_from_value_reads_all_fields() {
        let s = story(json!({
            "id": 42,
            "title": "Add login",
            "status": "todo",
            "priority": "p1",
            "blocked_by": ["S1", 7]
        }));
        assert_eq!(s.id.as_deref(), Some("42"));
        assert_eq!(s.title.as_deref(), Some("Add login"));
        assert_eq!(s.priority, Some(Priority::P1));
        assert_eq!(s.blocked_by, vec!["S1".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_blocked_by_single_value() {
        let s = story(json!({"blocked_by": "S1"}));
        assert_eq!(s.blocked_by, vec!["S1".to_string()]);
    }

    #[test]
    fn test_parse_stories_errors_are_distinct() {
        let path = Path::new("prd.json");

        let malformed = parse_stories("{ nope", path).unwrap_err().to_string();
        assert!(malformed.contains("Invalid JSON"));

        let not_object = parse_stories("[1, 2]", path).unwrap_err().to_string();
        assert!(not_object.contains("must be an object"));

        let missing = parse_stories(r#"{"tasks": []}"#, path)
            .unwrap_err()
            .to_string();
        assert!(missing.contains("must have a 'stories' array"));

        let wrong_type = parse_stories(r#"{"stories": {}}"#, path)
            .unwrap_err()
            .to_string();
        assert!(wrong_type.contains("'stories' must be an array"));
    }

    #[test]
    fn test_looks_like_story_list() {
        assert!(looks_like_story_list(r#"{"stories": []}"#));
        assert!(!looks_like_story_list(r#"{"items": []}"#));
        assert!(!looks_like_story_list("[]"));
        assert!(!looks_like_story_list("## Step by Step Tasks"));
    }

    #[test]
    fn test_next_story_respects_priority() {
        let stories = vec![
            story(json!({"id": "a", "status": "todo", "priority": "P2"})),
            story(json!({"id": "b", "status": "todo", "priority": "P0"})),
            story(json!({"id": "c", "status": "todo", "priority": "P1"})),
        ];
        assert_eq!(next_story(&stories).unwrap().id.as_deref(), Some("b"));
    }

    #[test]
    fn test_next_story_respects_blocked_by() {
        let stories = vec![
            story(json!({"id": "a", "status": "todo", "priority": "P1"})),
            story(json!({"id": "b", "status": "todo", "priority": "P0", "blocked_by": ["a"]})),
        ];
        assert_eq!(next_story(&stories).unwrap().id.as_deref(), Some("a"));
    }

    #[test]
    fn test_next_story_unblocked_once_dependency_done() {
        let stories = vec![
            story(json!({"id": "a", "status": "done", "priority": "P1"})),
            story(json!({"id": "b", "status": "todo", "priority": "P0", "blocked_by": ["a"]})),
        ];
        assert_eq!(next_story(&stories).unwrap().id.as_deref(), Some("b"));
    }

    #[test]
    fn test_next_story_ties_keep_document_order() {
        let stories = vec![
            story(json!({"id": "first", "status": "todo"})),
            story(json!({"id": "second", "status": "todo"})),
        ];
        assert_eq!(next_story(&stories).unwrap().id.as_deref(), Some("first"));
    }

    #[test]
    fn test_next_story_none_when_all_done() {
        let stories = vec![story(json!({"id": "a", "status": "done"}))];
        assert!(next_story(&stories).is_none());
    }

    #[test]
    fn test_label() {
        assert_eq!(story(json!({"id": "S1", "title": "X"})).label(), "S1: X");
        assert_eq!(story(json!({"id": "S1"})).label(), "S1");
        assert_eq!(story(json!({"title": "X"})).label(), "X");
        assert_eq!(story(json!({})).label(), "(untitled story)");
    }
}
