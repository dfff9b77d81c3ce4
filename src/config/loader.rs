//! Workflow file discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::WorkflowConfig;
use crate::error::{Result, StepwiseError};

/// File names searched in the project root, in priority order.
pub const CANDIDATES: &[&str] = &["stepwise.yml", "stepwise.yaml", ".stepwise/config.yml"];

/// Find the workflow file for a project.
///
/// An explicit path always wins, even when it does not exist, so a typo in
/// `--config` is reported instead of silently falling back.
pub fn discover(project_root: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_root.join(path)
        };
        if path.is_file() {
            return Ok(path);
        }
        return Err(StepwiseError::ConfigNotFound { path });
    }

    CANDIDATES
        .iter()
        .map(|name| project_root.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| StepwiseError::ConfigNotFound {
            path: project_root.join(CANDIDATES[0]),
        })
}

/// Walk up from `start` to the first directory holding a workflow file.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if CANDIDATES.iter().any(|name| current.join(name).is_file()) {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Read and parse one workflow file.
///
/// # Errors
///
/// `ConfigNotFound` when the file is missing, `ConfigParseError` when the
/// YAML does not match the schema.
pub fn load_file(path: &Path) -> Result<WorkflowConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StepwiseError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StepwiseError::Io(e)
        }
    })?;

    parse(&content, path)
}

/// Parse YAML content, attributing errors to `source_path`.
pub fn parse(content: &str, source_path: &Path) -> Result<WorkflowConfig> {
    serde_yaml::from_str(content).map_err(|e| StepwiseError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Discover and load the workflow for `project_root`.
pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<(PathBuf, WorkflowConfig)> {
    let path = discover(project_root, explicit)?;
    tracing::debug!(path = %path.display(), "Loading workflow");
    let config = load_file(&path)?;
    Ok((path, config))
}
