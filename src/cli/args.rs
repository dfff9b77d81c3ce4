//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Stepwise - sequential workflow runner with compensating rollback.
#[derive(Debug, Parser)]
#[command(name = "stepwise")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to workflow file (overrides stepwise.yml discovery)
    #[arg(short, long, global = true, env = "STEPWISE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show every attempt
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show failures and the summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run workflow groups (default if no command specified)
    Run(RunArgs),

    /// Show groups and steps with their capabilities
    List(ListArgs),

    /// Validate the workflow file
    Lint(LintArgs),

    /// Write a starter stepwise.yml
    Init(InitArgs),

    /// Print the JSON schema of the workflow file format
    Schema,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Top-level groups to run (default: all, in declared order)
    pub groups: Vec<String>,

    /// Run the selected groups concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// Print results as JSON instead of progress output
    #[arg(long)]
    pub json: bool,

    /// Leave the per-transition log out of results
    #[arg(long)]
    pub no_logs: bool,

    /// Use prompt defaults instead of asking
    #[arg(long)]
    pub non_interactive: bool,

    /// Override a workflow variable (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `lint` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LintArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `init` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct InitArgs {
    /// Overwrite an existing workflow file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parse `KEY=VALUE`.
fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
