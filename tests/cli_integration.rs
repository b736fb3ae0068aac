//! Integration tests for the Tally CLI

use assert_cmd::cargo;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the tally binary
fn tally() -> Command {
    Command::new(cargo::cargo_bin!("tally"))
}

#[test]
fn test_help() {
    tally()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Checklist progress tracking with automatic completion detection",
        ));
}

#[test]
fn test_version() {
    tally()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_init_creates_checklist() {
    let temp = TempDir::new().unwrap();

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(temp.path().join("TASKS.md").exists());
}

#[test]
fn test_init_twice_skips() {
    let temp = TempDir::new().unwrap();

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("init")
        .assert()
        .success();

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_snapshot() {
    let temp = TempDir::new().unwrap();

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshot yet"));
}

#[test]
fn test_recompute_then_status() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("TASKS.md"),
        "- [ ] 1 Build login form\n- [x] 2 Write unit tests\n",
    )
    .unwrap();

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("recompute")
        .assert()
        .success()
        .stdout(predicate::str::contains("1/2 tasks (50%)"));

    assert!(temp.path().join(".tally/progress.json").exists());

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("1/2 tasks (50%)"));
}

#[test]
fn test_complete_marks_task() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("TASKS.md"),
        "- [ ] 1 Build login form\n- [ ] 2 Write unit tests\n",
    )
    .unwrap();

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("complete")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("marked complete"));

    let text = std::fs::read_to_string(temp.path().join("TASKS.md")).unwrap();
    assert!(text.contains("- [x] 1 Build login form"));
    assert!(text.contains("- [ ] 2 Write unit tests"));
}

#[test]
fn test_complete_is_idempotent() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("TASKS.md"), "- [ ] 1 Build login form\n").unwrap();

    for _ in 0..2 {
        tally()
            .arg("--project")
            .arg(temp.path())
            .arg("complete")
            .arg("1")
            .assert()
            .success();
    }

    let text = std::fs::read_to_string(temp.path().join("TASKS.md")).unwrap();
    assert_eq!(text, "- [x] 1 Build login form\n");
}

#[test]
fn test_missing_project_directory() {
    tally()
        .arg("--project")
        .arg("/nonexistent/path/for/tally")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_config_file_changes_checklist_path() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("tally.toml"),
        "checklist_path = \"PLAN.md\"\n",
    )
    .unwrap();
    std::fs::write(temp.path().join("PLAN.md"), "- [x] 1 Only task\n").unwrap();

    tally()
        .arg("--project")
        .arg(temp.path())
        .arg("recompute")
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 tasks (100%)"));
}
