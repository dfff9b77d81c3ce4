//! Workflow validation rules.
//!
//! Every rule runs and every problem is collected, so `stepwise lint` can
//! report them all at once. Unknown `${var}` references are warnings: a
//! variable may come from the process environment at run time.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::config::interpolation;
use crate::config::schema::{EntryConfig, GroupConfig, Settings, StepConfig, WorkflowConfig};
use crate::error::{Result, StepwiseError};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Structured payload for problems that map onto a dedicated error variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    General,
    DuplicateKey { group: String, key: String },
    NegativeRetries { step: String, value: i64 },
}

/// One problem found in a workflow file.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Rule identifier, e.g. `duplicate-key`
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
    /// Slash-joined location, e.g. `setup/db/migrate`
    pub path: Option<String>,
    pub detail: Detail,
}

impl ValidationIssue {
    fn error(rule: &'static str, path: Option<String>, message: String) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            message,
            path,
            detail: Detail::General,
        }
    }

    fn warning(rule: &'static str, path: Option<String>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule, path, message)
        }
    }

    fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = detail;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The crate error this issue stands for.
    pub fn to_error(&self) -> StepwiseError {
        match &self.detail {
            Detail::DuplicateKey { group, key } => StepwiseError::DuplicateStepKey {
                group: group.clone(),
                key: key.clone(),
            },
            Detail::NegativeRetries { step, value } => StepwiseError::NegativeRetryBudget {
                step: step.clone(),
                value: *value,
            },
            Detail::General => StepwiseError::ConfigValidationError {
                message: self.message.clone(),
            },
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.rule, self.message)
    }
}

/// Run every rule and return all problems, errors and warnings alike.
pub fn validate_config(config: &WorkflowConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    validate_settings(&config.settings, &mut issues);

    for name in config.vars.keys() {
        if !IDENTIFIER.is_match(name) {
            issues.push(ValidationIssue::error(
                "invalid-variable-name",
                None,
                format!("Variable name '{}' is not a valid identifier", name),
            ));
        }
    }

    let mut seen = HashSet::new();
    for group in &config.groups {
        if !group.name.is_empty() && !seen.insert(group.name.as_str()) {
            issues.push(ValidationIssue::error(
                "duplicate-group",
                Some(group.name.clone()),
                format!("Group '{}' is declared more than once", group.name),
            ));
        }
        validate_group(group, &[], &mut issues);
    }

    let known = known_variables(config);
    for (path, text) in interpolated_fields(config) {
        for name in interpolation::variables(&text) {
            if !known.contains(&name) && std::env::var_os(&name).is_none() {
                issues.push(ValidationIssue::warning(
                    "unknown-variable",
                    Some(path.clone()),
                    format!("'{}' references unknown variable '{}'", path, name),
                ));
            }
        }
    }

    issues
}

/// Validate and fail on the first class of error.
///
/// A single problem is returned as its dedicated error variant; several are
/// joined into one `ConfigValidationError`. Warnings never fail.
pub fn validate(config: &WorkflowConfig) -> Result<()> {
    let errors: Vec<_> = validate_config(config)
        .into_iter()
        .filter(ValidationIssue::is_error)
        .collect();

    match errors.as_slice() {
        [] => Ok(()),
        [only] => Err(only.to_error()),
        many => Err(StepwiseError::ConfigValidationError {
            message: many
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }),
    }
}

fn validate_settings(settings: &Settings, issues: &mut Vec<ValidationIssue>) {
    if settings.retries < 0 {
        issues.push(
            ValidationIssue::error(
                "negative-retries",
                None,
                format!("settings.retries must not be negative (got {})", settings.retries),
            )
            .with_detail(Detail::NegativeRetries {
                step: "settings".to_string(),
                value: settings.retries,
            }),
        );
    }
    check_delay(settings.retry_delay_ms, "settings.retry_delay_ms", None, issues);
    if let Some(max) = settings.max_delay_ms {
        check_delay(max, "settings.max_delay_ms", None, issues);
    }
    if !settings.backoff.is_finite() || settings.backoff < 1.0 {
        issues.push(ValidationIssue::error(
            "invalid-backoff",
            None,
            format!("settings.backoff must be at least 1.0 (got {})", settings.backoff),
        ));
    }
    check_timeout(settings.timeout_secs, "settings.timeout_secs", None, issues);
}

fn validate_group(group: &GroupConfig, parent: &[&str], issues: &mut Vec<ValidationIssue>) {
    let mut path: Vec<&str> = parent.to_vec();
    path.push(&group.name);
    let here = path.join("/");

    if group.name.trim().is_empty() {
        issues.push(ValidationIssue::error(
            "empty-group-name",
            Some(here.clone()),
            "Group name must not be empty".to_string(),
        ));
    }

    if let Some(retries) = group.retries {
        if retries < 0 {
            issues.push(
                ValidationIssue::error(
                    "negative-retries",
                    Some(here.clone()),
                    format!("Group '{}' has a negative retry budget ({})", here, retries),
                )
                .with_detail(Detail::NegativeRetries {
                    step: here.clone(),
                    value: retries,
                }),
            );
        }
    }
    if let Some(delay) = group.retry_delay_ms {
        check_delay(delay, "retry_delay_ms", Some(&here), issues);
    }

    let mut keys = HashSet::new();
    for entry in &group.steps {
        let key = entry.key();
        if key.trim().is_empty() {
            issues.push(ValidationIssue::error(
                "empty-key",
                Some(here.clone()),
                format!("Group '{}' contains a step with an empty key", here),
            ));
        } else if !keys.insert(key) {
            issues.push(
                ValidationIssue::error(
                    "duplicate-key",
                    Some(format!("{}/{}", here, key)),
                    format!("Group '{}' declares '{}' more than once", here, key),
                )
                .with_detail(Detail::DuplicateKey {
                    group: group.name.clone(),
                    key: key.to_string(),
                }),
            );
        }

        match entry {
            EntryConfig::Step(step) => validate_step(step, &here, issues),
            EntryConfig::Group(nested) => validate_group(&nested.group, &path, issues),
        }
    }
}

fn validate_step(step: &StepConfig, group: &str, issues: &mut Vec<ValidationIssue>) {
    let here = format!("{}/{}", group, step.key);

    match (&step.run, &step.prompt) {
        (None, None) => issues.push(ValidationIssue::error(
            "missing-action",
            Some(here.clone()),
            format!("Step '{}' needs either 'run' or 'prompt'", here),
        )),
        (Some(_), Some(_)) => issues.push(ValidationIssue::error(
            "conflicting-action",
            Some(here.clone()),
            format!("Step '{}' declares both 'run' and 'prompt'", here),
        )),
        _ => {}
    }

    if let Some(retries) = step.retries {
        if retries < 0 {
            issues.push(
                ValidationIssue::error(
                    "negative-retries",
                    Some(here.clone()),
                    format!("Step '{}' has a negative retry budget ({})", here, retries),
                )
                .with_detail(Detail::NegativeRetries {
                    step: here.clone(),
                    value: retries,
                }),
            );
        }
    }
    if let Some(delay) = step.retry_delay_ms {
        check_delay(delay, "retry_delay_ms", Some(&here), issues);
    }
    check_timeout(step.timeout_secs, "timeout_secs", Some(&here), issues);

    if let Some(capture) = &step.capture {
        if step.run.is_none() {
            issues.push(ValidationIssue::error(
                "capture-without-run",
                Some(here.clone()),
                format!("Step '{}' captures output but has no 'run' command", here),
            ));
        }
        if !IDENTIFIER.is_match(capture) {
            issues.push(ValidationIssue::error(
                "invalid-variable-name",
                Some(here.clone()),
                format!("Capture name '{}' is not a valid identifier", capture),
            ));
        }
    }
}

fn check_delay(value: i64, field: &str, path: Option<&str>, issues: &mut Vec<ValidationIssue>) {
    if value < 0 {
        let location = path.map(|p| format!("{} ", p)).unwrap_or_default();
        issues.push(ValidationIssue::error(
            "negative-delay",
            path.map(str::to_string),
            format!("{}{} must not be negative (got {})", location, field, value),
        ));
    }
}

fn check_timeout(
    value: Option<f64>,
    field: &str,
    path: Option<&str>,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(secs) = value {
        let location = path.map(|p| format!("{} ", p)).unwrap_or_default();
        if !secs.is_finite() || secs <= 0.0 {
            issues.push(ValidationIssue::error(
                "invalid-timeout",
                path.map(str::to_string),
                format!("{}{} must be positive (got {})", location, field, secs),
            ));
        } else if Duration::try_from_secs_f64(secs).is_err() {
            issues.push(ValidationIssue::error(
                "invalid-timeout",
                path.map(str::to_string),
                format!("{}{} is too large (got {})", location, field, secs),
            ));
        }
    }
}

/// Variables that can exist at run time without the process environment.
fn known_variables(config: &WorkflowConfig) -> BTreeSet<String> {
    let mut known: BTreeSet<String> = config.vars.keys().cloned().collect();
    known.extend(config.env.keys().cloned());
    known.extend(["project_root".to_string(), "workflow".to_string()]);

    fn collect(group: &GroupConfig, known: &mut BTreeSet<String>) {
        for entry in &group.steps {
            match entry {
                EntryConfig::Step(step) => {
                    if let Some(capture) = &step.capture {
                        known.insert(capture.clone());
                    }
                    if step.prompt.is_some() {
                        known.insert(step.key.clone());
                    }
                }
                EntryConfig::Group(nested) => collect(&nested.group, known),
            }
        }
    }
    for group in &config.groups {
        collect(group, &mut known);
    }
    known
}

/// Every interpolated string in the file, with its location.
fn interpolated_fields(config: &WorkflowConfig) -> Vec<(String, String)> {
    fn collect(group: &GroupConfig, parent: &str, out: &mut Vec<(String, String)>) {
        let here = if parent.is_empty() {
            group.name.clone()
        } else {
            format!("{}/{}", parent, group.name)
        };
        for hook in [&group.on_submit, &group.on_cancel].into_iter().flatten() {
            out.push((here.clone(), hook.clone()));
        }
        for entry in &group.steps {
            match entry {
                EntryConfig::Step(step) => {
                    let path = format!("{}/{}", here, step.key);
                    let fields = [&step.run, &step.when, &step.rollback];
                    for text in fields.into_iter().flatten() {
                        out.push((path.clone(), text.clone()));
                    }
                    if let Some(prompt) = &step.prompt {
                        out.push((path.clone(), prompt.question.clone()));
                    }
                }
                EntryConfig::Group(nested) => collect(&nested.group, &here, out),
            }
        }
    }

    let mut out = Vec::new();
    for group in &config.groups {
        collect(group, "", &mut out);
    }
    out
}
