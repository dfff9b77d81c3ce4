//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. This allows:
//! - Single binary with subcommands (`stepwise run`, `stepwise lint`)
//! - Shared initialization logic
//! - Consistent global flag handling

pub mod completions;
pub mod dispatcher;
pub mod init;
pub mod lint;
pub mod list;
pub mod run;
pub mod schema;

pub use dispatcher::{
    Command, CommandContext, CommandDispatcher, CommandResult, EXIT_CANCELLED, EXIT_CONFIG,
};
