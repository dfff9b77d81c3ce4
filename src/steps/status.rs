//! Step status lifecycle.
//!
//! [`StepStatus`] is the closed set of states a step occupies during one
//! group invocation. [`StepStatus::can_follow`] encodes the legal
//! transitions; nothing in this module has side effects.

use serde::{Deserialize, Serialize};

/// Status of a step in a group invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The run action is executing (entered once per attempt).
    Started,

    /// The last attempt failed and another attempt is pending.
    Retrying,

    /// The run action completed without error.
    Succeeded,

    /// The step failed with no retries left.
    Failed,

    /// The guard evaluated false, or the run was cancelled before the step.
    Skipped,

    /// A previously succeeded step was compensated.
    RollbackSucceeded,

    /// Compensating a previously succeeded step failed.
    RollbackFailed,
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl StepStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [StepStatus; 7] = [
        StepStatus::Started,
        StepStatus::Retrying,
        StepStatus::Succeeded,
        StepStatus::Failed,
        StepStatus::Skipped,
        StepStatus::RollbackSucceeded,
        StepStatus::RollbackFailed,
    ];

    /// Check whether `self` may be recorded after `previous`.
    ///
    /// `None` means the step has no recorded status yet.
    pub fn can_follow(self, previous: Option<StepStatus>) -> bool {
        use StepStatus::{
            Failed, Retrying, RollbackFailed, RollbackSucceeded, Skipped, Started, Succeeded,
        };

        match previous {
            None => matches!(self, Started | Skipped),
            Some(Started) => matches!(self, Succeeded | Failed | Retrying),
            Some(Retrying) => matches!(self, Started | Failed),
            Some(Succeeded) | Some(Failed) => matches!(self, RollbackSucceeded | RollbackFailed),
            Some(Skipped) | Some(RollbackSucceeded) | Some(RollbackFailed) => false,
        }
    }

    /// Check if this is a terminal state for the forward run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Started | StepStatus::Retrying)
    }

    /// Whether this status is a rollback outcome.
    pub fn is_rollback(&self) -> bool {
        matches!(
            self,
            StepStatus::RollbackSucceeded | StepStatus::RollbackFailed
        )
    }

    /// Whether a step ending in this status counts toward `failed`.
    ///
    /// Compensated steps count as failed because their forward effect
    /// did not survive the run.
    pub fn counts_as_failure(&self) -> bool {
        matches!(
            self,
            StepStatus::Failed | StepStatus::RollbackSucceeded | StepStatus::RollbackFailed
        )
    }

    /// Log level used when this status is recorded.
    pub fn log_level(&self) -> LogLevel {
        match self {
            StepStatus::Started | StepStatus::Skipped => LogLevel::Info,
            StepStatus::Retrying | StepStatus::RollbackSucceeded => LogLevel::Warn,
            StepStatus::Failed | StepStatus::RollbackFailed => LogLevel::Error,
            StepStatus::Succeeded => LogLevel::Success,
        }
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Started => '◉',
            StepStatus::Retrying => '↻',
            StepStatus::Succeeded => '✓',
            StepStatus::Failed => '✗',
            StepStatus::Skipped => '○',
            StepStatus::RollbackSucceeded => '↶',
            StepStatus::RollbackFailed => '⚠',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Started => "started",
            StepStatus::Retrying => "retrying",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::RollbackSucceeded => "rollback_succeeded",
            StepStatus::RollbackFailed => "rollback_failed",
        };
        write!(f, "{}", s)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        };
        write!(f, "{}", s)
    }
}
