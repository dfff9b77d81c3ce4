//! Stepwise CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use stepwise::cli::commands::EXIT_CONFIG;
use stepwise::cli::{Cli, CommandContext, CommandDispatcher};
use stepwise::config::find_project_root;
use stepwise::shell::is_ci;
use stepwise::ui::{should_use_colors, OutputMode, Theme};
use stepwise::StepwiseError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN, so logs stay out of the progress output
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("stepwise=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stepwise=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("Stepwise starting with args: {:?}", cli);

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    let theme = if cli.no_color || !should_use_colors() {
        Theme::plain()
    } else {
        Theme::new()
    };

    let cwd = std::env::current_dir().unwrap_or_default();
    let config = cli.config.as_ref().map(|path| cwd.join(path));
    let project_root = cli
        .project
        .clone()
        .or_else(|| find_project_root(&cwd))
        .unwrap_or(cwd);

    let context = CommandContext {
        project_root,
        config,
        mode: OutputMode::from_flags(cli.verbose, cli.quiet),
        theme: theme.clone(),
        interactive: console::Term::stdout().is_term() && !is_ci(),
    };
    let dispatcher = CommandDispatcher::new(context);

    let mut stdout = std::io::stdout();
    match dispatcher.dispatch(&cli, &mut stdout).await {
        Ok(result) => ExitCode::from(u8::try_from(result.exit_code).unwrap_or(1)),
        Err(e) => {
            eprintln!("{}", theme.format_error(&format!("Error: {}", e)));
            if matches!(e, StepwiseError::ConfigNotFound { .. }) {
                eprintln!("Run 'stepwise init' to create one.");
            }
            if e.is_configuration() {
                ExitCode::from(EXIT_CONFIG as u8)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
