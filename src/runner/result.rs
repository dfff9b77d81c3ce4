//! Result aggregation.
//!
//! The [`Aggregator`] observes every emitted [`RunEvent`], keeps the latest
//! status per step, and produces an immutable [`RunResult`] snapshot.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::steps::{LogLevel, StepStatus};

use super::events::RunEvent;

/// One chronological log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub task_path: Vec<String>,
    pub timestamp_ms: i64,
}

/// How a group invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every entry ran to the end without failure.
    #[default]
    Completed,
    /// A step failed and the rollback cascade ran.
    RolledBack,
    /// Cancellation stopped the run.
    Cancelled,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunOutcome::Completed => "completed",
            RunOutcome::RolledBack => "rolled back",
            RunOutcome::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Final record for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub task_path: Vec<String>,
    pub status: StepStatus,
    /// Number of times the step entered `Started`.
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    pub fn key(&self) -> &str {
        self.task_path.last().map(String::as_str).unwrap_or_default()
    }
}

/// Aggregated outcome of one group invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Declared steps never reached because a rollback ended the run early.
    pub not_run: usize,
    pub outcome: RunOutcome,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogEntry>>,
}

impl RunResult {
    /// Steps with a recorded final status.
    pub fn recorded(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// Every declared step.
    pub fn total(&self) -> usize {
        self.recorded() + self.not_run
    }

    /// Whether the run completed with no failed step.
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed && self.failed == 0
    }

    /// Number of compensations that themselves failed.
    pub fn rollback_failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::RollbackFailed)
            .count()
    }

    /// Look up a step by key alone, taking the first match in execution
    /// order. Nested groups may reuse a key; use [`RunResult::step_at`] to
    /// tell them apart.
    pub fn step(&self, key: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.key() == key)
    }

    /// Look up a step by its full task path, root group name first.
    pub fn step_at(&self, path: &[&str]) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|s| s.task_path.iter().map(String::as_str).eq(path.iter().copied()))
    }
}

/// Accumulates per-step outcomes for one invocation.
#[derive(Debug)]
pub struct Aggregator {
    declared: usize,
    record_logs: bool,
    records: Vec<StepRecord>,
    index: HashMap<Vec<String>, usize>,
    logs: Vec<LogEntry>,
    outcome: RunOutcome,
    duration: Duration,
}

impl Aggregator {
    /// Create an aggregator for `declared` leaf steps.
    pub fn new(declared: usize, record_logs: bool) -> Self {
        Self {
            declared,
            record_logs,
            records: Vec::new(),
            index: HashMap::new(),
            logs: Vec::new(),
            outcome: RunOutcome::Completed,
            duration: Duration::ZERO,
        }
    }

    /// Record one status transition.
    pub fn observe(&mut self, event: &RunEvent) {
        let previous = self
            .index
            .get(&event.task_path)
            .map(|&i| self.records[i].status);

        if !event.status.can_follow(previous) {
            warn!(
                step = %event.path_string(),
                from = ?previous,
                to = %event.status,
                "Illegal status transition"
            );
        }

        let slot = match self.index.get(&event.task_path) {
            Some(&i) => i,
            None => {
                self.records.push(StepRecord {
                    task_path: event.task_path.clone(),
                    status: event.status,
                    attempts: 0,
                    error: None,
                });
                self.index
                    .insert(event.task_path.clone(), self.records.len() - 1);
                self.records.len() - 1
            }
        };

        let record = &mut self.records[slot];
        record.status = event.status;
        match event.status {
            StepStatus::Started => record.attempts += 1,
            StepStatus::Failed | StepStatus::RollbackFailed => {
                record.error = event.message.clone();
            }
            _ => {}
        }

        if self.record_logs {
            self.logs.push(LogEntry {
                level: event.status.log_level(),
                message: event
                    .message
                    .clone()
                    .unwrap_or_else(|| event.status.to_string()),
                task_path: event.task_path.clone(),
                timestamp_ms: event.timestamp_ms,
            });
        }
    }

    /// Seal the invocation's outcome and elapsed time.
    pub fn finish(&mut self, outcome: RunOutcome, duration: Duration) {
        self.outcome = outcome;
        self.duration = duration;
    }

    /// Immutable view of the aggregated outcome.
    pub fn snapshot(&self) -> RunResult {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for record in &self.records {
            match record.status {
                StepStatus::Succeeded => succeeded += 1,
                StepStatus::Skipped => skipped += 1,
                // Failed and compensated steps, plus any step left in
                // Started/Retrying by a torn-down run.
                _ => failed += 1,
            }
        }

        RunResult {
            succeeded,
            failed,
            skipped,
            not_run: self.declared.saturating_sub(self.records.len()),
            outcome: self.outcome,
            duration_ms: self.duration.as_millis() as u64,
            steps: self.records.clone(),
            logs: self.record_logs.then(|| self.logs.clone()),
        }
    }
}
