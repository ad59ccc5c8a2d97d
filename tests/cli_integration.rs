//! Integration tests for the ralph-loop CLI

use assert_cmd::cargo;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const TASK_DOC_ONE_PENDING: &str = "# Feature\n\n## Step by Step Tasks\n\n### Step 1: Build it\n- do it\n";
const TASK_DOC_DONE: &str =
    "# Feature\n\n## Step by Step Tasks\n\n### Step 1: Build it\n**Status:** complete\n- do it\n";

/// Get a Command for the ralph-loop binary, isolated from user config and env.
fn ralph_loop(dir: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("ralph-loop"));
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RALPH_LOOP_MODEL")
        .env_remove("RALPH_LOOP_MAX_ITERATIONS")
        .env_remove("RALPH_LOOP_COMPLETION_PROMISE")
        .env_remove("RALPH_LOOP_LOG_FILE");
    cmd
}

#[test]
fn test_help() {
    let temp = TempDir::new().unwrap();
    ralph_loop(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Drive a coding agent"));
}

#[test]
fn test_version() {
    let temp = TempDir::new().unwrap();
    ralph_loop(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_run_requires_spec() {
    let temp = TempDir::new().unwrap();
    ralph_loop(temp.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--spec"));
}

#[test]
fn test_spec_and_prd_are_exclusive() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.md"), TASK_DOC_ONE_PENDING).unwrap();

    ralph_loop(temp.path())
        .args(["run", "--spec", "a.md", "--prd", "a.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_missing_spec_file() {
    let temp = TempDir::new().unwrap();
    ralph_loop(temp.path())
        .args(["run", "--spec", "nope.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Spec file not found"));
}

#[test]
fn test_undetectable_format_fails_before_iterating() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("plan.txt"), "just some notes\n").unwrap();

    ralph_loop(temp.path())
        .args(["run", "--spec", "plan.txt", "--model", "definitely-not-an-agent-xyz"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not detect spec format"));

    assert!(!temp.path().join("plan-progress.txt").exists());
}

#[test]
fn test_invalid_story_list_is_rejected() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("prd.json"), r#"{"tasks": []}"#).unwrap();

    ralph_loop(temp.path())
        .args(["run", "--prd", "prd.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'stories' array"));
}

#[test]
fn test_status_reports_pending() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("prd.json"),
        r#"{"stories": [
            {"id": "US-1", "title": "Login", "status": "complete"},
            {"id": "US-2", "title": "Logout", "status": "todo", "priority": "P1"},
            {"id": "US-3", "title": "Signup", "status": "todo", "priority": "P0"}
        ]}"#,
    )
    .unwrap();

    ralph_loop(temp.path())
        .args(["status", "--prd", "prd.json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Pending: 2/3 stories"))
        .stdout(predicate::str::contains("Next: US-3: Signup"));
}

#[test]
fn test_status_json_when_complete() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("feature.md"), TASK_DOC_DONE).unwrap();

    let output = ralph_loop(temp.path())
        .args(["status", "--spec", "feature.md", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["format"], "task_doc");
    assert_eq!(report["total"], 1);
    assert_eq!(report["pending"], 0);
}

#[test]
fn test_run_with_nothing_pending_never_invokes_agent() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("feature.md"), TASK_DOC_DONE).unwrap();

    ralph_loop(temp.path())
        .args(["run", "--spec", "feature.md", "--model", "definitely-not-an-agent-xyz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All tasks complete"));

    let ledger = std::fs::read_to_string(temp.path().join("feature-progress.txt")).unwrap();
    assert!(ledger.starts_with("# Progress Log for feature\n"));
    assert!(!ledger.contains("### Iteration"));
}

#[test]
fn test_missing_agent_is_exception() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();

    ralph_loop(temp.path())
        .args(["run", "--spec", "feature.md", "--model", "definitely-not-an-agent-xyz"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Agent invocation failed"));

    let ledger = std::fs::read_to_string(temp.path().join("feature-progress.txt")).unwrap();
    assert!(ledger.contains("### Iteration 1 - "));
    assert!(ledger.contains("Status: Exception: "));
}

#[test]
fn test_project_config_is_applied() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
    std::fs::write(
        temp.path().join(".ralph-loop.toml"),
        "max_iterations = 0\nmodel = \"configured-agent-that-does-not-exist\"\n",
    )
    .unwrap();

    ralph_loop(temp.path())
        .args(["run", "--spec", "feature.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configured-agent-that-does-not-exist"));
}

#[test]
fn test_invalid_project_config() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
    std::fs::write(temp.path().join(".ralph-loop.toml"), "max_iterations = [").unwrap();

    ralph_loop(temp.path())
        .args(["run", "--spec", "feature.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[cfg(unix)]
mod fake_agent {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn write_agent(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-agent.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const MARK_SPEC_COMPLETE: &str =
        "printf '## Step by Step Tasks\\n\\n### Step 1: Build it\\n**Status:** complete\\n' > feature.md";

    fn run_args(agent: &Path) -> Vec<String> {
        vec![
            "run".into(),
            "--spec".into(),
            "feature.md".into(),
            "--model".into(),
            agent.display().to_string(),
            "--delay-secs".into(),
            "0".into(),
        ]
    }

    #[test]
    fn test_promise_ends_run_successfully() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
        let agent = write_agent(
            temp.path(),
            &format!("echo 'working on step 1'\n{MARK_SPEC_COMPLETE}\necho 'TASK COMPLETE'"),
        );

        ralph_loop(temp.path())
            .args(run_args(&agent))
            .assert()
            .success()
            .stdout(predicate::str::contains("working on step 1"))
            .stdout(predicate::str::contains("Completion promise detected"));

        let ledger = std::fs::read_to_string(temp.path().join("feature-progress.txt")).unwrap();
        assert_eq!(ledger.matches("### Iteration").count(), 1);
        assert!(ledger.contains("Status: Completed\n"));
    }

    #[test]
    fn test_promise_with_pending_work_stops_but_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
        let agent = write_agent(temp.path(), "echo 'TASK COMPLETE'");

        ralph_loop(temp.path())
            .args(run_args(&agent))
            .args(["--max-iterations", "5"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Completion promise detected"))
            .stdout(predicate::str::contains("Work remains"));

        let ledger = std::fs::read_to_string(temp.path().join("feature-progress.txt")).unwrap();
        assert_eq!(ledger.matches("### Iteration").count(), 1);
    }

    #[test]
    fn test_agent_output_keeps_stream_order() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
        let agent = write_agent(
            temp.path(),
            &format!("echo line-1\necho line-2 >&2\necho line-3\necho line-4 >&2\n{MARK_SPEC_COMPLETE}"),
        );

        ralph_loop(temp.path())
            .args(run_args(&agent))
            .assert()
            .success()
            .stdout(predicate::str::contains("line-1\nline-2\nline-3\nline-4\n"));
    }

    #[test]
    fn test_cap_with_failing_agent() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
        let agent = write_agent(temp.path(), "echo 'broken' >&2\nexit 2");

        ralph_loop(temp.path())
            .args(run_args(&agent))
            .args(["--max-iterations", "3"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("broken"))
            .stdout(predicate::str::contains("Reached max iterations (3)"));

        let ledger = std::fs::read_to_string(temp.path().join("feature-progress.txt")).unwrap();
        assert_eq!(ledger.matches("Status: Failed\n").count(), 3);
    }

    #[test]
    fn test_agent_completing_spec_ends_run() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
        let agent = write_agent(
            temp.path(),
            MARK_SPEC_COMPLETE,
        );

        ralph_loop(temp.path())
            .args(run_args(&agent))
            .args(["--max-iterations", "5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("All tasks complete"));

        let ledger = std::fs::read_to_string(temp.path().join("feature-progress.txt")).unwrap();
        assert_eq!(ledger.matches("### Iteration").count(), 1);
    }

    #[test]
    fn test_telemetry_log_is_written() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
        let agent = write_agent(
            temp.path(),
            &format!("{MARK_SPEC_COMPLETE}\necho 'TASK COMPLETE'"),
        );

        ralph_loop(temp.path())
            .args(run_args(&agent))
            .args(["--log", "logs/run.jsonl"])
            .assert()
            .success();

        let log = std::fs::read_to_string(temp.path().join("logs/run.jsonl")).unwrap();
        let events: Vec<serde_json::Value> = log
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(kinds.first(), Some(&"config"));
        assert!(kinds.contains(&"command_complete"));
        assert!(events.iter().any(|e| e["name"] == "promise_detected"));
        assert!(events.iter().all(|e| e["run_id"] == events[0]["run_id"]));
        assert!(events.iter().all(|e| e.get("ts").is_some()));
    }

    #[test]
    fn test_commits_changes_in_git_repo() {
        if which::which("git").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "user.name", "Test"],
            vec!["config", "commit.gpgsign", "false"],
        ] {
            assert!(std::process::Command::new("git")
                .args(&args)
                .current_dir(temp.path())
                .status()
                .unwrap()
                .success());
        }
        std::fs::write(temp.path().join("feature.md"), TASK_DOC_ONE_PENDING).unwrap();
        let agent = write_agent(temp.path(), "echo generated > output.txt");

        ralph_loop(temp.path())
            .args(run_args(&agent))
            .args(["--max-iterations", "1"])
            .assert()
            .code(1);

        let log = std::process::Command::new("git")
            .args(["log", "--format=%B"])
            .current_dir(temp.path())
            .output()
            .unwrap();
        let messages = String::from_utf8_lossy(&log.stdout);
        assert!(messages.contains("[feature] Ralph iteration 1"));
        assert!(messages.contains("Co-Authored-By: Claude <noreply@anthropic.com>"));
    }
}
