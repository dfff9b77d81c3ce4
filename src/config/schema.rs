//! Workflow file schema.
//!
//! These structs map one-to-one onto the YAML format. Numeric knobs that
//! must not be negative are read as signed integers so the validator can
//! report the offending value instead of a bare parse error.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Root of a `stepwise.yml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Display name for the workflow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Defaults applied to every group and step
    pub settings: Settings,

    /// Initial variables available to `${name}` interpolation
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,

    /// Environment variables exported to every command
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Top-level groups, run in declared order
    pub groups: Vec<GroupConfig>,
}

impl WorkflowConfig {
    /// Look up a top-level group by name.
    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Names of the top-level groups in declared order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }
}

/// Global defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Retry budget for steps that declare none
    pub retries: i64,

    /// Delay before the first retry, in milliseconds
    pub retry_delay_ms: i64,

    /// Multiplier applied to the delay after each retry
    pub backoff: f64,

    /// Upper bound on any single retry delay, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<i64>,

    /// Timeout for steps that declare none, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    /// Keep a chronological log in run results
    pub record_logs: bool,

    /// Run top-level groups concurrently
    pub concurrent: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_delay_ms: 0,
            backoff: 1.0,
            max_delay_ms: None,
            timeout_secs: None,
            record_logs: true,
            concurrent: false,
        }
    }
}

/// A named group of steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Retry budget for steps in this group that declare none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<i64>,

    /// Message recorded when every entry finished without failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_submit: Option<String>,

    /// Message recorded when the group is rolled back or cancelled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_cancel: Option<String>,

    pub steps: Vec<EntryConfig>,
}

/// One entry of a group: a step, or a nested group.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum EntryConfig {
    Group(NestedGroup),
    Step(StepConfig),
}

impl EntryConfig {
    /// Step key or nested group name.
    pub fn key(&self) -> &str {
        match self {
            EntryConfig::Group(nested) => &nested.group.name,
            EntryConfig::Step(step) => &step.key,
        }
    }
}

/// Wrapper marking a nested group: `- group: { name: ..., steps: [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NestedGroup {
    pub group: GroupConfig,
}

/// A single step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct StepConfig {
    /// Unique key within the enclosing group
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Shell command to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    /// Ask a question instead of running a command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptConfig>,

    /// Guard command; the step runs only when it exits 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    /// Compensating command run if a later step fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    /// Store the command's trimmed stdout in this variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<String>,

    /// Extra environment for this step's commands
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// A free-text question whose answer is stored under the step key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    pub question: String,

    /// Answer used when input is not interactive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// JSON schema of the workflow file format.
pub fn json_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(WorkflowConfig);
    serde_json::to_value(&schema).unwrap_or_default()
}
