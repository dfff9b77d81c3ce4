//! Stepwise - sequential workflow runner with compensating rollback.
//!
//! Stepwise runs named groups of steps in order. Each step may carry a
//! guard, a retry budget, a timeout, and a rollback action. When a step
//! fails for good, the steps that already succeeded in its group are rolled
//! back in reverse order.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Workflow file loading, validation, and building
//! - [`error`] - Error types and result aliases
//! - [`runner`] - Group execution, events, and result aggregation
//! - [`shell`] - Shell command execution and the shell step context
//! - [`steps`] - Steps, statuses, retry policies, and failures
//! - [`ui`] - Reporters, prompts, and terminal output
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use stepwise::config;
//!
//! let yaml = r#"
//! groups:
//!   - name: setup
//!     steps:
//!       - { key: deps, run: "npm ci", rollback: "rm -rf node_modules" }
//!       - { key: build, run: "npm run build", retries: 2 }
//! "#;
//! let file = config::parse(yaml, Path::new("stepwise.yml")).unwrap();
//! let workflow = config::build(&file, "demo").unwrap();
//!
//! assert_eq!(workflow.name, "demo");
//! assert_eq!(workflow.groups[0].step_count(), 2);
//! ```
//!
//! For running groups programmatically, see [`runner`].

pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod shell;
pub mod steps;
pub mod ui;

pub use error::{Result, StepwiseError};
