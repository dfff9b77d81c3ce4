//! Error types for stepwise operations.
//!
//! This module defines [`StepwiseError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Configuration problems are `StepwiseError` variants and abort a run
//!   before any step executes
//! - Step bodies return `anyhow::Error`; those failures are recorded in the
//!   run result and never surface as a `StepwiseError`
//! - All errors should provide actionable messages for users

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stepwise operations.
#[derive(Debug, Error)]
pub enum StepwiseError {
    /// Workflow file not found at expected location.
    #[error("Workflow file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse workflow file.
    #[error("Failed to parse workflow file at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid workflow structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// Two entries of the same group share a key.
    #[error("Duplicate step key '{key}' in group '{group}'")]
    DuplicateStepKey { group: String, key: String },

    /// A retry budget was configured below zero.
    #[error("Step '{step}' has a negative retry budget ({value})")]
    NegativeRetryBudget { step: String, value: i64 },

    /// Shell command exited unsuccessfully.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// A `${name}` reference could not be resolved.
    #[error("Unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// An interactive prompt could not be answered.
    #[error("Prompt '{key}' failed: {message}")]
    PromptFailed { key: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepwiseError {
    /// Whether this error stems from a bad workflow definition.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::DuplicateStepKey { .. }
                | Self::NegativeRetryBudget { .. }
        )
    }
}

/// Result type alias for stepwise operations.
pub type Result<T> = std::result::Result<T, StepwiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = StepwiseError::ConfigNotFound {
            path: PathBuf::from("/foo/stepwise.yml"),
        };
        assert!(err.to_string().contains("/foo/stepwise.yml"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = StepwiseError::ConfigParseError {
            path: PathBuf::from("/stepwise.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/stepwise.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn duplicate_step_key_displays_group_and_key() {
        let err = StepwiseError::DuplicateStepKey {
            group: "setup".into(),
            key: "install".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("setup"));
        assert!(msg.contains("install"));
    }

    #[test]
    fn negative_retry_budget_displays_value() {
        let err = StepwiseError::NegativeRetryBudget {
            step: "fetch".into(),
            value: -2,
        };
        let msg = err.to_string();
        assert!(msg.contains("fetch"));
        assert!(msg.contains("-2"));
    }

    #[test]
    fn command_failed_displays_command_and_code() {
        let err = StepwiseError::CommandFailed {
            command: "npm install".into(),
            code: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("npm install"));
        assert!(msg.contains("1"));
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(StepwiseError::DuplicateStepKey {
            group: "g".into(),
            key: "k".into()
        }
        .is_configuration());
        assert!(StepwiseError::NegativeRetryBudget {
            step: "s".into(),
            value: -1
        }
        .is_configuration());
        assert!(!StepwiseError::CommandFailed {
            command: "false".into(),
            code: Some(1)
        }
        .is_configuration());
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: StepwiseError = io_err.into();
        assert!(matches!(err, StepwiseError::Io(_)));
    }
}
