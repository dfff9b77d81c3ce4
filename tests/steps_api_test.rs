//! Integration tests for the steps public API.

use std::time::Duration;

use stepwise::steps::{FailureKind, RetryPolicy, Step, StepFailure, StepStatus};

#[test]
fn public_api_accessible() {
    let _status: StepStatus = StepStatus::Started;
    let _policy = RetryPolicy::default();
    let _failure = StepFailure::timeout(Duration::from_secs(1));
}

#[test]
fn lifecycle_transitions() {
    assert!(StepStatus::Started.can_follow(None));
    assert!(StepStatus::Skipped.can_follow(None));
    assert!(!StepStatus::Succeeded.can_follow(None));

    assert!(StepStatus::Retrying.can_follow(Some(StepStatus::Started)));
    assert!(StepStatus::Started.can_follow(Some(StepStatus::Retrying)));
    assert!(StepStatus::RollbackSucceeded.can_follow(Some(StepStatus::Succeeded)));
    assert!(!StepStatus::Started.can_follow(Some(StepStatus::Skipped)));

    for status in StepStatus::ALL {
        assert!(!status.can_follow(Some(StepStatus::RollbackFailed)));
    }
}

#[test]
fn failed_and_rollback_failed_are_distinct_failures() {
    assert_ne!(StepStatus::Failed, StepStatus::RollbackFailed);
    assert!(StepStatus::Failed.counts_as_failure());
    assert!(StepStatus::RollbackFailed.counts_as_failure());
    assert!(!StepStatus::Skipped.counts_as_failure());
}

#[test]
fn retry_policy_backoff_is_capped() {
    let policy = RetryPolicy::retries(5)
        .with_delay(Duration::from_millis(100))
        .with_backoff(2.0)
        .with_max_delay(Duration::from_millis(500));

    assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    assert_eq!(policy.delay_for(4), Duration::from_millis(500));
}

#[test]
fn step_builder_attaches_capabilities() {
    let step = Step::<()>::sync("deploy", |_| Ok(()))
        .when_sync(|_| true)
        .rollback_sync(|_| Ok(()))
        .retries(2)
        .timeout(Duration::from_secs(30));

    assert_eq!(step.key(), "deploy");
    assert!(step.has_guard());
    assert!(step.has_rollback());
    assert_eq!(step.retry().map(|p| p.max_retries), Some(2));
    assert_eq!(step.time_limit(), Some(Duration::from_secs(30)));
}

#[test]
fn failures_carry_their_kind() {
    let err = anyhow::anyhow!("disk full");
    assert_eq!(StepFailure::step(&err).kind, FailureKind::Step);
    assert_eq!(StepFailure::guard(&err).kind, FailureKind::Guard);
    assert_eq!(StepFailure::rollback(&err).kind, FailureKind::Rollback);

    let cancelled = StepFailure::cancelled(&StepFailure::step(&err));
    assert_eq!(cancelled.kind, FailureKind::Cancelled);
    assert!(cancelled.message.contains("disk full"));
}
