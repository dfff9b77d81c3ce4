//! Integration tests for the stepwise binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("stepwise.yml"), config).unwrap();
    temp
}

fn stepwise(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("stepwise"));
    cmd.current_dir(temp.path())
        .env_remove("STEPWISE_CONFIG")
        .env("NO_COLOR", "1");
    cmd
}

const SIMPLE_CONFIG: &str = r#"
name: demo
vars:
  greeting: hello
groups:
  - name: setup
    on_submit: "setup finished"
    steps:
      - key: hello
        run: "echo ${greeting}"
      - key: skipped
        run: "echo never"
        when: "false"
  - name: build
    steps:
      - key: compile
        run: "true"
"#;

const FAILING_CONFIG: &str = r#"
name: broken
groups:
  - name: setup
    on_cancel: "setup rolled back"
    steps:
      - key: create
        run: "touch made.txt"
        rollback: "rm -f made.txt"
      - key: explode
        run: "exit 7"
        retries: 1
  - name: later
    steps:
      - { key: never, run: "touch never.txt" }
"#;

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stepwise"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("workflow runner"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stepwise"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_no_args_runs_every_group() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    stepwise(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ setup completed"))
        .stdout(predicate::str::contains("✓ build completed"))
        .stdout(predicate::str::contains("○ skipped"))
        .stdout(predicate::str::contains("setup finished"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_run_selected_group() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    stepwise(&temp)
        .args(["run", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("build completed"))
        .stdout(predicate::str::contains("setup completed").not());
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_run_failure_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(FAILING_CONFIG);
    stepwise(&temp)
        .arg("run")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("↻ explode"))
        .stdout(predicate::str::contains("↶ create rolled back"))
        .stdout(predicate::str::contains("Not started: later"))
        .stdout(predicate::str::contains("setup rolled back"));
    assert!(!temp.path().join("made.txt").exists());
    assert!(!temp.path().join("never.txt").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_run_json_report() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(FAILING_CONFIG);
    let output = stepwise(&temp).args(["run", "--json", "setup"]).output()?;
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let result = &report["groups"][0]["result"];
    assert_eq!(report["workflow"], "broken");
    assert_eq!(result["outcome"], "rolled_back");
    assert_eq!(result["failed"], 2);
    assert_eq!(result["steps"][1]["attempts"], 2);
    assert!(result["logs"].is_array());
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_run_no_logs_drops_log() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    let output = stepwise(&temp)
        .args(["run", "--json", "--no-logs"])
        .output()?;
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert!(report["groups"][0]["result"].get("logs").is_none());
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_run_var_override() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        "groups:\n  - name: g\n    steps:\n      - { key: write, run: \"echo ${mode} > mode.txt\" }\n",
    );
    stepwise(&temp)
        .args(["run", "--var", "mode=release"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(temp.path().join("mode.txt"))?.trim(),
        "release"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn cli_prompt_uses_default_when_not_interactive() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
groups:
  - name: g
    steps:
      - key: target
        prompt: { question: "Deploy where?", default: staging }
      - { key: use, run: "echo ${target} > target.txt" }
"#,
    );
    stepwise(&temp)
        .args(["run", "--non-interactive"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(temp.path().join("target.txt"))?.trim(),
        "staging"
    );
    Ok(())
}

#[test]
fn cli_run_no_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    stepwise(&temp)
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Workflow file not found"));
    Ok(())
}

#[test]
fn cli_run_duplicate_keys_is_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        "groups:\n  - name: g\n    steps:\n      - { key: a, run: 'touch a.txt' }\n      - { key: a, run: 'true' }\n",
    );
    stepwise(&temp)
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Duplicate step key 'a'"));
    assert!(!temp.path().join("a.txt").exists());
    Ok(())
}

#[test]
fn cli_explicit_config_flag() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("other.yml"), SIMPLE_CONFIG)?;
    stepwise(&temp)
        .args(["--config", "other.yml", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("▸ demo"));
    Ok(())
}

#[test]
fn cli_list_shows_tree() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(FAILING_CONFIG);
    stepwise(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("create [run, rollback]"))
        .stdout(predicate::str::contains("explode [run, retries]"));
    Ok(())
}

#[test]
fn cli_lint_validates_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    stepwise(&temp)
        .arg("lint")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
    Ok(())
}

#[test]
fn cli_lint_reports_errors() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("groups:\n  - name: g\n    retries: -1\n    steps:\n      - { key: a }\n");
    stepwise(&temp)
        .arg("lint")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[negative-retries]"))
        .stdout(predicate::str::contains("[missing-action]"));
    Ok(())
}

#[test]
fn cli_init_creates_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    stepwise(&temp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(temp.path().join("stepwise.yml").exists());

    stepwise(&temp).arg("lint").assert().success();
    Ok(())
}

#[test]
fn cli_init_fails_if_config_exists() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    stepwise(&temp)
        .arg("init")
        .assert()
        .failure()
        .stdout(predicate::str::contains("already exists"));
    Ok(())
}

#[test]
fn cli_schema_prints_json() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let output = stepwise(&temp).arg("schema").output()?;
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert!(schema["properties"]["groups"].is_object());
    Ok(())
}

#[test]
fn cli_completions_bash() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    stepwise(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stepwise"));
    Ok(())
}

#[test]
fn cli_debug_flag_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    stepwise(&temp).args(["--debug", "list"]).assert().success();
    Ok(())
}

#[test]
fn cli_invalid_command_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stepwise"));
    cmd.arg("invalid-command");
    cmd.assert().failure();
    Ok(())
}
