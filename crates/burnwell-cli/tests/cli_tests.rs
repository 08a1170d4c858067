//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Runs in an empty directory with an empty HOME so no real config is found.
fn burnwell(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("burnwell").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("BURNWELL_API_URL")
        .env_remove("BURNWELL_API_TOKEN")
        .env_remove("BURNWELL_USER_ID")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created burnwell.toml"));

    let written = std::fs::read_to_string(dir.path().join("burnwell.toml")).unwrap();
    assert!(written.contains("[backend]"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir).arg("init").assert().success();

    burnwell(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn questions_offline_table() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["questions", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("I feel emotionally drained from my work."))
        .stdout(predicate::str::contains("depersonalization"))
        .stdout(predicate::str::contains("22 questions"));
}

#[test]
fn questions_offline_json() {
    let dir = TempDir::new().unwrap();

    let output = burnwell(&dir)
        .args(["questions", "--offline", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let questions = parsed.as_array().unwrap();
    assert_eq!(questions.len(), 22);
    assert_eq!(questions[0]["id"], 1);
    assert_eq!(questions[0]["category"], "emotional_exhaustion");
}

#[test]
fn questions_unknown_format() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["questions", "--offline", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: unknown format"));
}

#[test]
fn take_offline_partial_submission() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["take", "--offline", "--user", "1"])
        .write_stdin("4\n0\ns\ny\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 1 of 22"))
        .stdout(predicate::str::contains("You have answered 2/22 (9%). Submit anyway?"))
        .stdout(predicate::str::contains("Overall burnout level: Low"));
}

#[test]
fn take_offline_quit() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["take", "--offline", "--user", "1"])
        .write_stdin("3\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 2 of 22"))
        .stdout(predicate::str::contains("Overall burnout level").not());
}

#[test]
fn take_uses_user_from_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("burnwell.toml"),
        "user_id = \"5\"\nadvance_delay_ms = 0\n\n[backend]\ntype = \"offline\"\n",
    )
    .unwrap();

    burnwell(&dir)
        .arg("take")
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 1 of 22"));
}

#[test]
fn take_without_user_fails() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["take", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: no user id"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["status", "--user", "1", "--config", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn status_offline_has_nothing_in_progress() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["status", "--offline", "--user", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No assessment in progress for user 1."));
}

#[test]
fn unreachable_server_is_fatal_for_questions() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .args(["questions"])
        .env("BURNWELL_API_URL", "http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: failed to fetch questions"));
}

#[test]
fn help_output() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Burnout self-assessment client"));
}

#[test]
fn version_output() {
    let dir = TempDir::new().unwrap();

    burnwell(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("burnwell"));
}
