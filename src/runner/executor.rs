//! Group execution.
//!
//! [`Runner`] drives a [`Group`] against one context: guard evaluation,
//! retries with backoff, timeouts, cancellation at step boundaries, and the
//! reverse-order rollback cascade after an unrecoverable failure. Every status
//! transition is emitted as a [`RunEvent`] to the caller's sink and folded into
//! the run's [`Aggregator`].

use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::{join_all, BoxFuture};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::steps::{Condition, FailureKind, RetryPolicy, Step, StepFailure, StepStatus};

use super::events::{EventSink, RunEvent};
use super::group::{Entry, Group, Hook};
use super::result::{Aggregator, RunOutcome, RunResult};

/// Options shared by every invocation of a [`Runner`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Retry policy for steps and groups that declare none.
    pub default_retry: RetryPolicy,
    /// Timeout for steps that declare none.
    pub default_timeout: Option<Duration>,
    /// Keep a chronological log in the result.
    pub record_logs: bool,
    /// Checked before each step and before each retry attempt.
    pub cancel: Option<CancellationToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            default_retry: RetryPolicy::none(),
            default_timeout: None,
            record_logs: true,
            cancel: None,
        }
    }
}

impl RunOptions {
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_default_retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = policy;
        self
    }

    pub fn with_default_timeout(mut self, limit: Duration) -> Self {
        self.default_timeout = Some(limit);
        self
    }

    /// Drop the per-transition log from results.
    pub fn without_logs(mut self) -> Self {
        self.record_logs = false;
        self
    }
}

/// Result of one invocation plus the context handed back to the caller.
#[derive(Debug)]
pub struct RunOutput<C> {
    pub result: RunResult,
    pub context: C,
}

/// Executes groups.
///
/// A runner holds only options; each call to [`Runner::run`] builds fresh
/// execution state, so one runner may drive any number of invocations.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    options: RunOptions,
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Check a group's preconditions without running anything.
    pub fn validate<C>(&self, group: &Group<C>) -> Result<()> {
        group.validate()
    }

    /// Run `group` to completion against `context`.
    ///
    /// Returns an error only for configuration problems, which are detected
    /// before the first step starts. Step failures are reported through the
    /// result and the sink.
    pub async fn run<C>(
        &self,
        group: &Group<C>,
        mut context: C,
        sink: &mut dyn EventSink,
    ) -> Result<RunOutput<C>>
    where
        C: Send + Sync,
    {
        group.validate()?;

        let started = Instant::now();
        info!(
            group = group.name(),
            steps = group.step_count(),
            "Running group"
        );

        let mut execution = Execution {
            options: &self.options,
            sink,
            aggregator: Aggregator::new(group.step_count(), self.options.record_logs),
        };
        let (end, _) = execution
            .run_group(group, &mut context, &[], &self.options.default_retry)
            .await;
        execution.aggregator.finish(end.outcome, started.elapsed());

        let result = execution.aggregator.snapshot();
        info!(
            group = group.name(),
            outcome = %result.outcome,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            "Group finished"
        );
        Ok(RunOutput { result, context })
    }

    /// Run independent groups concurrently, each against its own context.
    ///
    /// Every group is validated before any of them starts. Each invocation
    /// receives its own clone of `sink`.
    pub async fn run_all<C, S>(
        &self,
        jobs: Vec<(&Group<C>, C)>,
        sink: S,
    ) -> Result<Vec<RunOutput<C>>>
    where
        C: Send + Sync,
        S: EventSink + Clone,
    {
        for (group, _) in &jobs {
            group.validate()?;
        }

        let runs = jobs.into_iter().map(|(group, context)| {
            let mut sink = sink.clone();
            async move { self.run(group, context, &mut sink).await }
        });

        join_all(runs).await.into_iter().collect()
    }
}

/// How a group scope ended.
#[derive(Debug, Clone, Copy)]
struct GroupEnd {
    outcome: RunOutcome,
    /// A step in this scope failed and the cascade ran.
    failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepEnd {
    Succeeded,
    Skipped,
    Failed { cancelled: bool },
}

/// A succeeded step awaiting possible compensation.
struct Pending<'g, C> {
    step: &'g Step<C>,
    path: Vec<String>,
}

/// State for one invocation.
struct Execution<'r, S: EventSink + ?Sized> {
    options: &'r RunOptions,
    sink: &'r mut S,
    aggregator: Aggregator,
}

impl<'r, S: EventSink + ?Sized> Execution<'r, S> {
    fn run_group<'a, 'g, C>(
        &'a mut self,
        group: &'g Group<C>,
        ctx: &'a mut C,
        parent: &'a [String],
        inherited: &'a RetryPolicy,
    ) -> BoxFuture<'a, (GroupEnd, Vec<Pending<'g, C>>)>
    where
        C: Send + Sync,
        'g: 'a,
    {
        Box::pin(async move {
            let path = child_path(parent, group.name());
            let policy = group.retry().unwrap_or(inherited);
            let entries = group.entries();
            let mut completed: Vec<Pending<'g, C>> = Vec::new();

            debug!(group = %path.join("/"), entries = entries.len(), "Entering group");

            for (index, entry) in entries.iter().enumerate() {
                if self.is_cancelled() {
                    info!(group = %path.join("/"), "Cancelled; skipping remaining steps");
                    self.skip_entries(&entries[index..], &path);
                    fire(group.cancel_hook(), ctx);
                    let end = GroupEnd {
                        outcome: RunOutcome::Cancelled,
                        failed: false,
                    };
                    return (end, Vec::new());
                }

                let (failed, cancelled) = match entry {
                    Entry::Step(step) => {
                        match self.run_step(step, &mut *ctx, &path, policy).await {
                            StepEnd::Succeeded => {
                                if step.has_rollback() {
                                    completed.push(Pending {
                                        step,
                                        path: child_path(&path, step.key()),
                                    });
                                }
                                (false, false)
                            }
                            StepEnd::Skipped => (false, false),
                            StepEnd::Failed { cancelled } => (true, cancelled),
                        }
                    }
                    Entry::Group(child) => {
                        let (end, leftover) =
                            self.run_group(child, &mut *ctx, &path, policy).await;
                        if end.outcome == RunOutcome::Completed {
                            completed.extend(leftover);
                        }
                        (end.failed, end.outcome == RunOutcome::Cancelled)
                    }
                };

                if !failed && !cancelled {
                    continue;
                }

                if failed {
                    self.unwind(&mut completed, &mut *ctx).await;
                }
                if cancelled {
                    self.skip_entries(&entries[index + 1..], &path);
                }
                fire(group.cancel_hook(), ctx);

                let outcome = if cancelled {
                    RunOutcome::Cancelled
                } else {
                    RunOutcome::RolledBack
                };
                return (GroupEnd { outcome, failed }, Vec::new());
            }

            fire(group.submit_hook(), ctx);
            let end = GroupEnd {
                outcome: RunOutcome::Completed,
                failed: false,
            };
            (end, completed)
        })
    }

    async fn run_step<C>(
        &mut self,
        step: &Step<C>,
        ctx: &mut C,
        parent: &[String],
        inherited: &RetryPolicy,
    ) -> StepEnd
    where
        C: Send + Sync,
    {
        let path = child_path(parent, step.key());
        let policy = step.retry().unwrap_or(inherited);
        let limit = step.time_limit().or(self.options.default_timeout);

        // A guard that errors is a failure of the first attempt, and is asked
        // again before any retry runs the step.
        let mut guard_passed = true;
        let mut pending_failure = None;
        if let Some(condition) = step.condition() {
            match check_guard(condition, &*ctx, limit).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(step = %path.join("/"), "Condition not met");
                    self.emit(
                        StepStatus::Skipped,
                        &path,
                        Some("Skipped: condition not met".to_string()),
                    );
                    return StepEnd::Skipped;
                }
                Err(failure) => {
                    guard_passed = false;
                    pending_failure = Some(failure);
                }
            }
        }

        let attempts = policy.max_retries.saturating_add(1);
        let mut retries_used = 0u32;
        loop {
            let attempt = retries_used + 1;
            let message = if attempt == 1 {
                "Started".to_string()
            } else {
                format!("Attempt {} of {}", attempt, attempts)
            };
            self.emit(StepStatus::Started, &path, Some(message));

            let outcome = match pending_failure.take() {
                Some(failure) => Err(failure),
                None => attempt_step(step, &mut *ctx, limit, &mut guard_passed).await,
            };

            let failure = match outcome {
                Ok(()) => {
                    self.emit(StepStatus::Succeeded, &path, Some("Succeeded".to_string()));
                    return StepEnd::Succeeded;
                }
                Err(failure) => failure,
            };

            if retries_used >= policy.max_retries {
                warn!(
                    step = %path.join("/"),
                    attempts = attempt,
                    kind = %failure.kind,
                    error = %failure,
                    "Step failed"
                );
                self.emit(StepStatus::Failed, &path, Some(failure.message));
                return StepEnd::Failed { cancelled: false };
            }

            retries_used += 1;
            warn!(
                step = %path.join("/"),
                attempt,
                error = %failure,
                "Step failed; retrying"
            );
            self.emit(
                StepStatus::Retrying,
                &path,
                Some(format!("Attempt {} failed: {}", attempt, failure)),
            );

            let options = self.options;
            pause(options.cancel.as_ref(), policy.delay_for(retries_used)).await;
            if self.is_cancelled() {
                let failure = StepFailure::cancelled(&failure);
                self.emit(StepStatus::Failed, &path, Some(failure.message));
                return StepEnd::Failed { cancelled: true };
            }
        }
    }

    /// Compensate completed steps, most recent first.
    async fn unwind<'g, C>(&mut self, completed: &mut Vec<Pending<'g, C>>, ctx: &mut C)
    where
        C: Send + Sync,
    {
        if completed.is_empty() {
            return;
        }
        info!(count = completed.len(), "Rolling back completed steps");

        while let Some(pending) = completed.pop() {
            let Some(rollback) = pending.step.compensation() else {
                continue;
            };
            let limit = pending
                .step
                .time_limit()
                .or(self.options.default_timeout);

            match race(limit, rollback.call(&mut *ctx), StepFailure::rollback).await {
                Ok(()) => {
                    self.emit(
                        StepStatus::RollbackSucceeded,
                        &pending.path,
                        Some("Rolled back".to_string()),
                    );
                }
                Err(failure) => {
                    warn!(
                        step = %pending.path.join("/"),
                        error = %failure,
                        "Rollback failed; continuing cascade"
                    );
                    self.emit(
                        StepStatus::RollbackFailed,
                        &pending.path,
                        Some(format!("Rollback failed: {}", failure)),
                    );
                }
            }
        }
    }

    /// Record every step under `entries` as skipped by cancellation.
    fn skip_entries<C>(&mut self, entries: &[Entry<C>], parent: &[String]) {
        for entry in entries {
            match entry {
                Entry::Step(step) => {
                    let path = child_path(parent, step.key());
                    self.emit(
                        StepStatus::Skipped,
                        &path,
                        Some("Skipped: run cancelled".to_string()),
                    );
                }
                Entry::Group(child) => {
                    let path = child_path(parent, child.name());
                    self.skip_entries(child.entries(), &path);
                }
            }
        }
    }

    fn emit(&mut self, status: StepStatus, path: &[String], message: Option<String>) {
        let event = RunEvent::new(status, path.to_vec(), message);
        debug!(step = %event.path_string(), %status, "Status transition");
        self.aggregator.observe(&event);
        self.sink.emit(&event);
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Wait before a retry; cancellation cuts the wait short.
async fn pause(cancel: Option<&CancellationToken>, delay: Duration) {
    if delay.is_zero() {
        return;
    }
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => {}
            }
        }
        None => tokio::time::sleep(delay).await,
    }
}

/// One attempt: re-ask a previously failed guard, then run the step body.
async fn attempt_step<C>(
    step: &Step<C>,
    ctx: &mut C,
    limit: Option<Duration>,
    guard_passed: &mut bool,
) -> std::result::Result<(), StepFailure>
where
    C: Send + Sync,
{
    if !*guard_passed {
        if let Some(condition) = step.condition() {
            if !check_guard(condition, &*ctx, limit).await? {
                return Err(StepFailure {
                    kind: FailureKind::Guard,
                    message: "condition not met after an earlier guard error".to_string(),
                });
            }
        }
        *guard_passed = true;
    }
    race(limit, step.action().call(ctx), StepFailure::step).await
}

async fn check_guard<C>(
    condition: &dyn Condition<C>,
    ctx: &C,
    limit: Option<Duration>,
) -> std::result::Result<bool, StepFailure>
where
    C: Send + Sync,
{
    race(limit, condition.check(ctx), StepFailure::guard)
        .await
        .map_err(|mut failure| {
            if failure.kind == FailureKind::Timeout {
                failure.message = format!("condition {}", failure.message);
            }
            failure
        })
}

/// Await `fut`, racing it against `limit` when one is set.
async fn race<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = anyhow::Result<T>>,
    classify: fn(&anyhow::Error) -> StepFailure,
) -> std::result::Result<T, StepFailure> {
    let outcome = match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(StepFailure::timeout(limit)),
        },
        None => fut.await,
    };
    outcome.map_err(|err| classify(&err))
}

fn fire<C>(hook: Option<&Hook<C>>, ctx: &mut C) {
    if let Some(hook) = hook {
        hook(ctx);
    }
}

fn child_path(parent: &[String], name: &str) -> Vec<String> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(name.to_string());
    path
}
