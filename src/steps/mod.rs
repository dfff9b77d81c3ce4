//! Steps and their status lifecycle.
//!
//! This module provides the building blocks the runner executes:
//!
//! - [`Step`] - A named unit of work with optional guard, rollback, retry, and timeout
//! - [`Action`] / [`Condition`] - Async seams for run bodies and guards
//! - [`StepStatus`] - The closed status set and its legal transitions
//! - [`RetryPolicy`] - Retry budget and backoff pacing
//! - [`StepFailure`] - Why a step or its compensation did not complete
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use stepwise::steps::{RetryPolicy, Step};
//!
//! #[derive(Default)]
//! struct Deploy {
//!     released: bool,
//! }
//!
//! let step = Step::<Deploy>::sync("release", |ctx| {
//!     ctx.released = true;
//!     Ok(())
//! })
//! .when_sync(|ctx| !ctx.released)
//! .rollback_sync(|ctx| {
//!     ctx.released = false;
//!     Ok(())
//! })
//! .retry_policy(RetryPolicy::retries(2).with_delay(Duration::from_millis(50)))
//! .timeout(Duration::from_secs(30));
//!
//! assert!(step.has_guard());
//! assert!(step.has_rollback());
//! ```

pub mod failure;
pub mod retry;
pub mod status;
pub mod step;

pub use failure::{FailureKind, StepFailure};
pub use retry::RetryPolicy;
pub use status::{LogLevel, StepStatus};
pub use step::{
    Action, Condition, FnAction, FnCondition, Step, StepFuture, SyncAction, SyncCondition,
};
