//! The step contract.
//!
//! A [`Step`] is a named unit of work over a caller-defined context `C`.
//! The run body is an [`Action`]; everything else is an optional capability
//! attached with a builder method:
//!
//! - a guard ([`Condition`]) deciding whether the run body executes at all
//! - a compensating rollback ([`Action`]) invoked when a later step fails
//! - a [`RetryPolicy`] overriding the group default
//! - a timeout raced against the guard, the run body, and the rollback

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::retry::RetryPolicy;

/// Boxed future returned by closure-based actions and conditions.
pub type StepFuture<'a, T> = BoxFuture<'a, anyhow::Result<T>>;

/// A unit of work over a shared, mutable context.
#[async_trait]
pub trait Action<C>: Send + Sync {
    /// Run the action. Errors are recorded as step failures.
    async fn call(&self, ctx: &mut C) -> anyhow::Result<()>;
}

/// A read-only predicate over the shared context.
#[async_trait]
pub trait Condition<C>: Send + Sync {
    /// Decide whether the guarded step should run.
    async fn check(&self, ctx: &C) -> anyhow::Result<bool>;
}

/// Adapter turning an async closure into an [`Action`].
pub struct FnAction<F>(pub F);

#[async_trait]
impl<C, F> Action<C> for FnAction<F>
where
    C: Send,
    F: for<'a> Fn(&'a mut C) -> StepFuture<'a, ()> + Send + Sync,
{
    async fn call(&self, ctx: &mut C) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}

/// Adapter turning a blocking closure into an [`Action`].
pub struct SyncAction<F>(pub F);

#[async_trait]
impl<C, F> Action<C> for SyncAction<F>
where
    C: Send,
    F: Fn(&mut C) -> anyhow::Result<()> + Send + Sync,
{
    async fn call(&self, ctx: &mut C) -> anyhow::Result<()> {
        (self.0)(ctx)
    }
}

/// Adapter turning an async closure into a [`Condition`].
pub struct FnCondition<F>(pub F);

#[async_trait]
impl<C, F> Condition<C> for FnCondition<F>
where
    C: Sync,
    F: for<'a> Fn(&'a C) -> StepFuture<'a, bool> + Send + Sync,
{
    async fn check(&self, ctx: &C) -> anyhow::Result<bool> {
        (self.0)(ctx).await
    }
}

/// Adapter turning a plain predicate into an infallible [`Condition`].
pub struct SyncCondition<F>(pub F);

#[async_trait]
impl<C, F> Condition<C> for SyncCondition<F>
where
    C: Sync,
    F: Fn(&C) -> bool + Send + Sync,
{
    async fn check(&self, ctx: &C) -> anyhow::Result<bool> {
        Ok((self.0)(ctx))
    }
}

/// A single named unit of work within a group.
///
/// Steps are immutable once built; the context is the only thing that
/// changes while a group runs.
pub struct Step<C> {
    key: String,
    run: Box<dyn Action<C>>,
    guard: Option<Box<dyn Condition<C>>>,
    rollback: Option<Box<dyn Action<C>>>,
    retry: Option<RetryPolicy>,
    timeout: Option<Duration>,
}

impl<C: Send + Sync> Step<C> {
    /// Create a step from an async closure.
    ///
    /// ```
    /// use stepwise::steps::Step;
    ///
    /// let step = Step::<Vec<String>>::new("greet", |log| {
    ///     Box::pin(async move {
    ///         log.push("hello".to_string());
    ///         anyhow::Ok(())
    ///     })
    /// });
    /// assert_eq!(step.key(), "greet");
    /// ```
    pub fn new<F>(key: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> StepFuture<'a, ()> + Send + Sync + 'static,
    {
        Self::from_action(key, FnAction(run))
    }

    /// Create a step from a blocking closure.
    pub fn sync<F>(key: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut C) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::from_action(key, SyncAction(run))
    }

    /// Create a step from any [`Action`] implementation.
    pub fn from_action(key: impl Into<String>, action: impl Action<C> + 'static) -> Self {
        Self {
            key: key.into(),
            run: Box::new(action),
            guard: None,
            rollback: None,
            retry: None,
            timeout: None,
        }
    }

    /// Guard the step with an async predicate.
    pub fn when<F>(self, guard: F) -> Self
    where
        F: for<'a> Fn(&'a C) -> StepFuture<'a, bool> + Send + Sync + 'static,
    {
        self.with_condition(FnCondition(guard))
    }

    /// Guard the step with a plain predicate.
    pub fn when_sync<F>(self, guard: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.with_condition(SyncCondition(guard))
    }

    /// Guard the step with any [`Condition`] implementation.
    pub fn with_condition(mut self, condition: impl Condition<C> + 'static) -> Self {
        self.guard = Some(Box::new(condition));
        self
    }

    /// Attach an async compensating action.
    pub fn rollback<F>(self, rollback: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> StepFuture<'a, ()> + Send + Sync + 'static,
    {
        self.with_rollback(FnAction(rollback))
    }

    /// Attach a blocking compensating action.
    pub fn rollback_sync<F>(self, rollback: F) -> Self
    where
        F: Fn(&mut C) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.with_rollback(SyncAction(rollback))
    }

    /// Attach any [`Action`] as the compensating action.
    pub fn with_rollback(mut self, action: impl Action<C> + 'static) -> Self {
        self.rollback = Some(Box::new(action));
        self
    }

    /// Allow `max_retries` immediate retries, keeping any pacing already set.
    pub fn retries(mut self, max_retries: u32) -> Self {
        let policy = self.retry.take().unwrap_or_default();
        self.retry = Some(RetryPolicy {
            max_retries,
            ..policy
        });
        self
    }

    /// Replace the retry policy for this step.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Race the guard, run body, and rollback against `limit`.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

impl<C> Step<C> {
    /// Unique key within the enclosing group.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    pub fn has_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    /// Retry policy attached to this step, if any.
    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Timeout attached to this step, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn action(&self) -> &dyn Action<C> {
        self.run.as_ref()
    }

    pub(crate) fn condition(&self) -> Option<&dyn Condition<C>> {
        self.guard.as_deref()
    }

    pub(crate) fn compensation(&self) -> Option<&dyn Action<C>> {
        self.rollback.as_deref()
    }
}

impl<C> std::fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("key", &self.key)
            .field("guard", &self.guard.is_some())
            .field("rollback", &self.rollback.is_some())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    struct Bump;

    #[async_trait]
    impl Action<Counter> for Bump {
        async fn call(&self, ctx: &mut Counter) -> anyhow::Result<()> {
            ctx.hits += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn async_closure_runs_against_context() {
        let step = Step::<Counter>::new("bump", |ctx| {
            Box::pin(async move {
                ctx.hits += 2;
                anyhow::Ok(())
            })
        });
        let mut ctx = Counter::default();
        step.action().call(&mut ctx).await.unwrap();
        assert_eq!(ctx.hits, 2);
    }

    #[tokio::test]
    async fn trait_action_runs_against_context() {
        let step = Step::from_action("bump", Bump);
        let mut ctx = Counter::default();
        step.action().call(&mut ctx).await.unwrap();
        assert_eq!(ctx.hits, 1);
    }

    #[tokio::test]
    async fn sync_guard_reads_context() {
        let step: Step<Counter> =
            Step::sync("noop", |_| Ok(())).when_sync(|ctx: &Counter| ctx.hits > 0);
        let guard = step.condition().unwrap();
        assert!(!guard.check(&Counter::default()).await.unwrap());
        assert!(guard.check(&Counter { hits: 1 }).await.unwrap());
    }

    #[tokio::test]
    async fn rollback_is_optional_capability() {
        let plain: Step<Counter> = Step::sync("plain", |_| Ok(()));
        assert!(!plain.has_rollback());

        let undo = Step::sync("undo", |_| Ok(())).rollback_sync(|ctx: &mut Counter| {
            ctx.hits = 0;
            Ok(())
        });
        assert!(undo.has_rollback());
        let mut ctx = Counter { hits: 5 };
        undo.compensation().unwrap().call(&mut ctx).await.unwrap();
        assert_eq!(ctx.hits, 0);
    }

    #[test]
    fn retries_keep_existing_pacing() {
        let step: Step<Counter> = Step::sync("flaky", |_| Ok(()))
            .retry_policy(RetryPolicy::none().with_delay(Duration::from_millis(5)))
            .retries(3);
        let policy = step.retry().unwrap();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_millis(5));
    }

    #[test]
    fn debug_hides_closures() {
        let step: Step<Counter> = Step::sync("shown", |_| Ok(())).timeout(Duration::from_secs(1));
        let rendered = format!("{:?}", step);
        assert!(rendered.contains("shown"));
        assert!(rendered.contains("timeout"));
    }
}
