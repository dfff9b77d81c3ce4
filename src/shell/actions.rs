//! Step bodies and guards backed by shell commands and prompts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use console::Term;

use crate::error::StepwiseError;
use crate::steps::{Action, Condition};
use crate::ui::prompts;

use super::command::{execute, execute_checked};
use super::context::ShellContext;

/// Runs a command; a non-zero exit fails the step.
#[derive(Debug, Clone)]
pub struct ShellAction {
    command: String,
    env: BTreeMap<String, String>,
    capture: Option<String>,
}

impl ShellAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: BTreeMap::new(),
            capture: None,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Store trimmed stdout in the variable `name` after success.
    pub fn capture(mut self, name: impl Into<String>) -> Self {
        self.capture = Some(name.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Action<ShellContext> for ShellAction {
    async fn call(&self, ctx: &mut ShellContext) -> anyhow::Result<()> {
        let command = ctx.interpolate(&self.command)?;
        let options = ctx.command_options(&self.env)?;
        let result = execute_checked(&command, &options).await?;

        if let Some(name) = &self.capture {
            tracing::debug!(variable = %name, "Captured command output");
            ctx.vars
                .insert(name.clone(), result.stdout.trim().to_string());
        }
        Ok(())
    }
}

/// Guard command: exit 0 means the step runs, any other exit skips it.
///
/// Only a failure to spawn the command is an error.
#[derive(Debug, Clone)]
pub struct ShellCondition {
    command: String,
    env: BTreeMap<String, String>,
}

impl ShellCondition {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

#[async_trait]
impl Condition<ShellContext> for ShellCondition {
    async fn check(&self, ctx: &ShellContext) -> anyhow::Result<bool> {
        let command = ctx.interpolate(&self.command)?;
        let options = ctx.command_options(&self.env)?;
        let result = execute(&command, &options).await?;
        Ok(result.success())
    }
}

/// Asks a question and stores the answer in the variable named after the step.
///
/// Answers come from `STEPWISE_PROMPT_<KEY>` when set, then the terminal when
/// the run is interactive, then the default.
#[derive(Debug, Clone)]
pub struct PromptAction {
    key: String,
    question: String,
    default: Option<String>,
}

impl PromptAction {
    pub fn new(key: impl Into<String>, question: impl Into<String>, default: Option<String>) -> Self {
        Self {
            key: key.into(),
            question: question.into(),
            default,
        }
    }
}

#[async_trait]
impl Action<ShellContext> for PromptAction {
    async fn call(&self, ctx: &mut ShellContext) -> anyhow::Result<()> {
        let default = self
            .default
            .as_deref()
            .map(|d| ctx.interpolate(d))
            .transpose()?;

        let answer = if let Ok(value) = std::env::var(prompts::override_var(&self.key)) {
            value
        } else if ctx.interactive {
            let key = self.key.clone();
            let question = ctx.interpolate(&self.question)?;
            tokio::task::spawn_blocking(move || {
                prompts::ask(&key, &question, default.as_deref(), &Term::stderr())
            })
            .await
            .map_err(|e| StepwiseError::PromptFailed {
                key: self.key.clone(),
                message: e.to_string(),
            })??
        } else {
            default.ok_or_else(|| StepwiseError::PromptFailed {
                key: self.key.clone(),
                message: "no default answer and input is not interactive".to_string(),
            })?
        };

        ctx.vars.insert(self.key.clone(), answer);
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn context() -> ShellContext {
        let temp = std::env::temp_dir();
        ShellContext::new("test", temp).with_vars(BTreeMap::from([(
            "who".to_string(),
            "world".to_string(),
        )]))
    }

    #[tokio::test]
    async fn shell_action_captures_trimmed_stdout() {
        let mut ctx = context();
        let action = ShellAction::new("echo hello ${who}").capture("greeting");
        action.call(&mut ctx).await.unwrap();
        assert_eq!(ctx.vars.get("greeting").map(String::as_str), Some("hello world"));
    }

    #[tokio::test]
    async fn shell_action_fails_on_nonzero_exit() {
        let mut ctx = context();
        let err = ShellAction::new("exit 4").call(&mut ctx).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Some(4)"));
    }

    #[tokio::test]
    async fn shell_action_fails_on_unknown_variable() {
        let mut ctx = context();
        let err = ShellAction::new("echo ${stepwise_surely_missing}")
            .call(&mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("stepwise_surely_missing"));
    }

    #[tokio::test]
    async fn shell_action_passes_step_env() {
        let mut ctx = context();
        let action = ShellAction::new("echo $LABEL")
            .with_env(BTreeMap::from([("LABEL".to_string(), "v-${who}".to_string())]))
            .capture("label");
        action.call(&mut ctx).await.unwrap();
        assert_eq!(ctx.vars.get("label").map(String::as_str), Some("v-world"));
    }

    #[tokio::test]
    async fn shell_condition_maps_exit_status() {
        let ctx = context();
        assert!(ShellCondition::new("true").check(&ctx).await.unwrap());
        assert!(!ShellCondition::new("false").check(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn prompt_uses_default_when_not_interactive() {
        let mut ctx = context();
        let action = PromptAction::new(
            "stepwise_test_answer",
            "Name?",
            Some("hi ${who}".to_string()),
        );
        action.call(&mut ctx).await.unwrap();
        assert_eq!(
            ctx.vars.get("stepwise_test_answer").map(String::as_str),
            Some("hi world")
        );
    }

    #[tokio::test]
    async fn prompt_without_default_fails_when_not_interactive() {
        let mut ctx = context();
        let action = PromptAction::new("stepwise_test_no_default", "Name?", None);
        let err = action.call(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("not interactive"));
    }
}
