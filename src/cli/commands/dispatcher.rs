//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::error::Result;
use crate::ui::{OutputMode, Theme};

/// Exit code for a run stopped by Ctrl-C.
pub const EXIT_CANCELLED: i32 = 130;
/// Exit code for an unusable workflow file.
pub const EXIT_CONFIG: i32 = 2;

/// Settings every command sees.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_root: PathBuf,
    /// Explicit `--config` path, if any.
    pub config: Option<PathBuf>,
    pub mode: OutputMode,
    pub theme: Theme,
    /// Whether a human can answer prompts.
    pub interactive: bool,
}

impl CommandContext {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            config: None,
            mode: OutputMode::Normal,
            theme: Theme::plain(),
            interactive: false,
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Directory name, used when the workflow file has no `name`.
    pub fn project_name(&self) -> String {
        self.project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workflow".to_string())
    }
}

/// Trait for command implementations.
///
/// Commands write user-facing output to `out`; diagnostics go through
/// `tracing`.
#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(
        &self,
        ctx: &CommandContext,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    context: CommandContext,
}

impl CommandDispatcher {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Route the parsed CLI to its command and execute it.
    pub async fn dispatch(
        &self,
        cli: &Cli,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        let command: Box<dyn Command> = match &cli.command {
            Some(Commands::Run(args)) => Box::new(super::run::RunCommand::new(args.clone())),
            Some(Commands::List(args)) => Box::new(super::list::ListCommand::new(args.clone())),
            Some(Commands::Lint(args)) => Box::new(super::lint::LintCommand::new(args.clone())),
            Some(Commands::Init(args)) => Box::new(super::init::InitCommand::new(args.clone())),
            Some(Commands::Schema) => Box::new(super::schema::SchemaCommand),
            Some(Commands::Completions(args)) => {
                Box::new(super::completions::CompletionsCommand::new(args.clone()))
            }
            // Default to running every group
            None => Box::new(super::run::RunCommand::new(RunArgs::default())),
        };
        command.execute(&self.context, out).await
    }
}
