//! Shell command execution.
//!
//! Commands run on `tokio::process` with `kill_on_drop`, so a step timeout
//! that drops the future also terminates the child.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use crate::error::{Result, StepwiseError};

use super::platform::shell_invocation;

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last non-empty line of stderr, falling back to stdout.
    pub fn last_output_line(&self) -> Option<&str> {
        fn pick(text: &str) -> Option<&str> {
            text.lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
        }
        pick(&self.stderr).or_else(|| pick(&self.stdout))
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with the process environment).
    pub env: BTreeMap<String, String>,
}

/// Run `command` through the platform shell and collect its output.
///
/// A non-zero exit is not an error here; callers inspect
/// [`CommandResult::exit_code`]. Only a failure to spawn is reported as
/// `CommandFailed`.
pub async fn execute(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();
    let (program, flag) = shell_invocation();

    let mut cmd = tokio::process::Command::new(program);
    cmd.arg(flag)
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&options.env);

    tracing::debug!(command, "Spawning shell command");
    let output = cmd.output().await.map_err(|e| {
        tracing::warn!(command, error = %e, "Failed to spawn command");
        StepwiseError::CommandFailed {
            command: command.to_string(),
            code: None,
        }
    })?;

    Ok(CommandResult {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: start.elapsed(),
    })
}

/// Run `command` and fail unless it exits 0.
///
/// The error carries the last line of output so step failures read well in
/// reports.
pub async fn execute_checked(command: &str, options: &CommandOptions) -> anyhow::Result<CommandResult> {
    let result = execute(command, options).await?;
    if result.success() {
        return Ok(result);
    }

    let failure = StepwiseError::CommandFailed {
        command: command.to_string(),
        code: result.exit_code,
    };
    match result.last_output_line() {
        Some(line) => Err(anyhow::Error::new(failure).context(line.to_string())),
        None => Err(failure.into()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_successful_command() {
        let result = execute("echo hello", &CommandOptions::default()).await.unwrap();
        assert!(result.success());
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn execute_failing_command() {
        let result = execute("exit 3", &CommandOptions::default()).await.unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, Some(3));
    }

    #[tokio::test]
    async fn execute_with_env() {
        let mut options = CommandOptions::default();
        options
            .env
            .insert("STEPWISE_TEST_VAR".to_string(), "hello".to_string());
        let result = execute("echo $STEPWISE_TEST_VAR", &options).await.unwrap();
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn execute_in_working_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "x").unwrap();
        let options = CommandOptions {
            cwd: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        let result = execute("ls", &options).await.unwrap();
        assert!(result.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn checked_failure_carries_last_line() {
        let err = execute_checked("echo first >&2; echo boom >&2; exit 1", &CommandOptions::default())
            .await
            .unwrap_err();
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("boom"));
        assert!(rendered.contains("exit"));
    }

    #[test]
    fn last_output_line_prefers_stderr() {
        let result = CommandResult {
            exit_code: Some(1),
            stdout: "out\n".to_string(),
            stderr: "err one\nerr two\n\n".to_string(),
            duration: Duration::ZERO,
        };
        assert_eq!(result.last_output_line(), Some("err two"));
    }

    #[test]
    fn last_output_line_falls_back_to_stdout() {
        let result = CommandResult {
            exit_code: Some(2),
            stdout: "  building
  done  
".to_string(),
            stderr: "
   
".to_string(),
            duration: Duration::ZERO,
        };
        assert_eq!(result.last_output_line(), Some("done"));

        let silent = CommandResult {
            stdout: String::new(),
            stderr: String::new(),
            ..result
        };
        assert_eq!(silent.last_output_line(), None);
    }
}
