//! Execution context shared by shell-backed workflow steps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::interpolation;
use crate::error::Result;

use super::command::CommandOptions;

/// State threaded through every step of a workflow run.
///
/// Variables resolve in order: workflow and captured `vars`, workflow `env`,
/// built-ins (`project_root`, `workflow`), then the process environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShellContext {
    pub workflow: String,
    pub project_root: PathBuf,
    pub vars: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    /// Whether prompts may read from the terminal.
    pub interactive: bool,
    /// Messages recorded by group hooks, in firing order.
    pub notices: Vec<String>,
}

impl ShellContext {
    pub fn new(workflow: impl Into<String>, project_root: impl AsRef<Path>) -> Self {
        Self {
            workflow: workflow.into(),
            project_root: project_root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Resolve a single variable.
    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.vars.get(name).or_else(|| self.env.get(name)) {
            return Some(value.clone());
        }
        match name {
            "project_root" => Some(self.project_root.display().to_string()),
            "workflow" => Some(self.workflow.clone()),
            _ => std::env::var(name).ok(),
        }
    }

    /// Substitute every `${name}` in `text`.
    pub fn interpolate(&self, text: &str) -> Result<String> {
        interpolation::resolve(text, |name| self.lookup(name))
    }

    /// Options for a command run on behalf of a step.
    ///
    /// Commands run in the project root with the workflow environment plus
    /// `extra`, whose values are interpolated first.
    pub fn command_options(&self, extra: &BTreeMap<String, String>) -> Result<CommandOptions> {
        let mut env = self.env.clone();
        for (key, value) in extra {
            env.insert(key.clone(), self.interpolate(value)?);
        }
        Ok(CommandOptions {
            cwd: Some(self.project_root.clone()),
            env,
        })
    }
}
