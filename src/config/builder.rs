//! Turns a validated workflow file into runnable groups.

use std::time::Duration;

use crate::config::schema::{EntryConfig, GroupConfig, Settings, StepConfig, WorkflowConfig};
use crate::config::validator;
use crate::error::{Result, StepwiseError};
use crate::runner::{Group, RunOptions};
use crate::shell::{PromptAction, ShellAction, ShellCondition, ShellContext};
use crate::steps::{RetryPolicy, Step};

/// A workflow ready to run.
#[derive(Debug)]
pub struct Workflow {
    pub name: String,
    pub groups: Vec<Group<ShellContext>>,
    /// Defaults derived from `settings`; no cancellation token yet.
    pub options: RunOptions,
    pub concurrent: bool,
}

impl Workflow {
    /// Pick top-level groups by name, keeping declared order when `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Group<ShellContext>>> {
        if names.is_empty() {
            return Ok(self.groups.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.groups
                    .iter()
                    .find(|g| g.name() == name)
                    .ok_or_else(|| StepwiseError::ConfigValidationError {
                        message: format!(
                            "Unknown group '{}' (available: {})",
                            name,
                            self.groups
                                .iter()
                                .map(|g| g.name())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    })
            })
            .collect()
    }
}

/// Validate `config` and build its groups.
///
/// `fallback_name` names the workflow when the file does not.
pub fn build(config: &WorkflowConfig, fallback_name: &str) -> Result<Workflow> {
    validator::validate(config)?;

    let default_retry = settings_policy(&config.settings)?;
    let groups = config
        .groups
        .iter()
        .map(|group| build_group(group, &default_retry))
        .collect::<Result<Vec<_>>>()?;

    let default_timeout = config
        .settings
        .timeout_secs
        .map(|secs| timeout(secs, "settings.timeout_secs"))
        .transpose()?;

    let options = RunOptions {
        default_retry,
        default_timeout,
        record_logs: config.settings.record_logs,
        cancel: None,
    };

    Ok(Workflow {
        name: config
            .name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string()),
        groups,
        options,
        concurrent: config.settings.concurrent,
    })
}

/// Convert a signed retry budget, rejecting negatives.
pub fn retry_budget(owner: &str, value: i64) -> Result<u32> {
    if value < 0 {
        return Err(StepwiseError::NegativeRetryBudget {
            step: owner.to_string(),
            value,
        });
    }
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}

fn millis(value: i64) -> Duration {
    Duration::from_millis(value.max(0).unsigned_abs())
}

fn settings_policy(settings: &Settings) -> Result<RetryPolicy> {
    let mut policy = RetryPolicy::retries(retry_budget("settings", settings.retries)?)
        .with_delay(millis(settings.retry_delay_ms))
        .with_backoff(settings.backoff);
    if let Some(max) = settings.max_delay_ms {
        policy = policy.with_max_delay(millis(max));
    }
    Ok(policy)
}

/// Apply per-group or per-step overrides on top of the inherited policy.
fn override_policy(
    owner: &str,
    inherited: &RetryPolicy,
    retries: Option<i64>,
    delay_ms: Option<i64>,
) -> Result<Option<RetryPolicy>> {
    if retries.is_none() && delay_ms.is_none() {
        return Ok(None);
    }
    let mut policy = inherited.clone();
    if let Some(retries) = retries {
        policy.max_retries = retry_budget(owner, retries)?;
    }
    if let Some(delay) = delay_ms {
        policy.delay = millis(delay);
    }
    Ok(Some(policy))
}

fn build_group(config: &GroupConfig, inherited: &RetryPolicy) -> Result<Group<ShellContext>> {
    let mut group = Group::new(config.name.clone());

    let own = override_policy(&config.name, inherited, config.retries, config.retry_delay_ms)?;
    let effective = own.clone().unwrap_or_else(|| inherited.clone());
    if let Some(policy) = own {
        group = group.retry_policy(policy);
    }

    for entry in &config.steps {
        group = match entry {
            EntryConfig::Step(step) => group.step(build_step(step, &effective)?),
            EntryConfig::Group(nested) => group.group(build_group(&nested.group, &effective)?),
        };
    }

    if let Some(message) = config.on_submit.clone() {
        group = group.on_submit(move |ctx: &mut ShellContext| notify(ctx, &message));
    }
    if let Some(message) = config.on_cancel.clone() {
        group = group.on_cancel(move |ctx: &mut ShellContext| notify(ctx, &message));
    }

    Ok(group)
}

fn notify(ctx: &mut ShellContext, message: &str) {
    let text = ctx
        .interpolate(message)
        .unwrap_or_else(|_| message.to_string());
    ctx.notices.push(text);
}

fn build_step(config: &StepConfig, inherited: &RetryPolicy) -> Result<Step<ShellContext>> {
    let mut step = match (&config.run, &config.prompt) {
        (Some(command), _) => {
            let mut action = ShellAction::new(command.clone()).with_env(config.env.clone());
            if let Some(name) = &config.capture {
                action = action.capture(name.clone());
            }
            Step::from_action(config.key.clone(), action)
        }
        (None, Some(prompt)) => Step::from_action(
            config.key.clone(),
            PromptAction::new(
                config.key.clone(),
                prompt.question.clone(),
                prompt.default.clone(),
            ),
        ),
        (None, None) => {
            return Err(StepwiseError::ConfigValidationError {
                message: format!("Step '{}' needs either 'run' or 'prompt'", config.key),
            })
        }
    };

    if let Some(guard) = &config.when {
        step = step.with_condition(ShellCondition::new(guard.clone()).with_env(config.env.clone()));
    }
    if let Some(rollback) = &config.rollback {
        step = step.with_rollback(ShellAction::new(rollback.clone()).with_env(config.env.clone()));
    }
    if let Some(policy) =
        override_policy(&config.key, inherited, config.retries, config.retry_delay_ms)?
    {
        step = step.retry_policy(policy);
    }
    if let Some(secs) = config.timeout_secs {
        step = step.timeout(timeout(secs, &config.key)?);
    }

    Ok(step)
}

fn timeout(secs: f64, owner: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|err| StepwiseError::ConfigValidationError {
        message: format!("{}: invalid timeout {}: {}", owner, secs, err),
    })
}
