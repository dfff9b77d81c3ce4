//! Group execution and result aggregation.
//!
//! - [`Group`] - Ordered, nestable collection of steps sharing one context
//! - [`Runner`] - Drives a group: guards, retries, timeouts, cancellation, rollback
//! - [`RunEvent`] / [`EventSink`] - The status event stream
//! - [`RunResult`] - Per-invocation counts, outcome, and step records
//!
//! # Example
//!
//! ```
//! use stepwise::runner::{Group, RecordingSink, RunOutcome, Runner};
//! use stepwise::steps::Step;
//!
//! let group = Group::new("setup")
//!     .step(Step::<Vec<&str>>::sync("fetch", |log| {
//!         log.push("fetch");
//!         Ok(())
//!     }))
//!     .step(Step::<Vec<&str>>::sync("build", |log| {
//!         log.push("build");
//!         Ok(())
//!     }));
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_all()
//!     .build()
//!     .unwrap();
//! let mut sink = RecordingSink::new();
//! let output = runtime
//!     .block_on(Runner::default().run(&group, Vec::new(), &mut sink))
//!     .unwrap();
//!
//! assert_eq!(output.context, vec!["fetch", "build"]);
//! assert_eq!(output.result.outcome, RunOutcome::Completed);
//! assert_eq!(output.result.succeeded, 2);
//! ```

pub mod events;
pub mod executor;
pub mod group;
pub mod result;

pub use events::{ChannelSink, EventSink, FnSink, NullSink, RecordingSink, RunEvent};
pub use executor::{RunOptions, RunOutput, Runner};
pub use group::{Entry, Group, Hook};
pub use result::{Aggregator, LogEntry, RunOutcome, RunResult, StepRecord};
