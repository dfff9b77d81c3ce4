//! Step-level failure taxonomy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a step (or its compensation) did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The run action returned an error.
    Step,
    /// The run action, guard, or rollback exceeded the step timeout.
    Timeout,
    /// The guard returned an error.
    Guard,
    /// A rollback action returned an error.
    Rollback,
    /// Cancellation was observed before a retry attempt.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Step => "step",
            FailureKind::Timeout => "timeout",
            FailureKind::Guard => "guard",
            FailureKind::Rollback => "rollback",
            FailureKind::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// A recorded failure with its cause rendered for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl StepFailure {
    /// Failure raised by the run action.
    pub fn step(err: &anyhow::Error) -> Self {
        Self {
            kind: FailureKind::Step,
            message: format!("{:#}", err),
        }
    }

    /// Failure raised by the guard.
    pub fn guard(err: &anyhow::Error) -> Self {
        Self {
            kind: FailureKind::Guard,
            message: format!("condition failed: {:#}", err),
        }
    }

    /// Failure raised by a rollback action.
    pub fn rollback(err: &anyhow::Error) -> Self {
        Self {
            kind: FailureKind::Rollback,
            message: format!("{:#}", err),
        }
    }

    /// A timer won the race against an action.
    pub fn timeout(limit: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: format!("timed out after {}", humanize(limit)),
        }
    }

    /// Cancellation cut the retry loop short.
    pub fn cancelled(last: &StepFailure) -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: format!("cancelled before retry (last error: {})", last.message),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn humanize(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
