//! Shell command execution and the context shell-backed steps share.

pub mod actions;
pub mod command;
pub mod context;
pub mod platform;

pub use actions::{PromptAction, ShellAction, ShellCondition};
pub use command::{execute, execute_checked, CommandOptions, CommandResult};
pub use context::ShellContext;
pub use platform::{is_ci, shell_invocation};
