//! Lint command implementation.
//!
//! The `stepwise lint` command reports every problem in the workflow file
//! without running anything.

use std::io::Write;

use async_trait::async_trait;

use crate::cli::args::LintArgs;
use crate::config::{self, Severity};
use crate::error::Result;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The lint command implementation.
pub struct LintCommand {
    args: LintArgs,
}

impl LintCommand {
    pub fn new(args: LintArgs) -> Self {
        Self { args }
    }

    pub fn args(&self) -> &LintArgs {
        &self.args
    }
}

#[async_trait]
impl Command for LintCommand {
    async fn execute(
        &self,
        ctx: &CommandContext,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        let (path, config) = config::load(&ctx.project_root, ctx.config_path())?;
        let issues = config::validate_config(&config);
        let theme = &ctx.theme;

        for issue in &issues {
            let line = match issue.severity {
                Severity::Error => theme.format_error(&issue.to_string()),
                Severity::Warning => theme.format_warning(&issue.to_string()),
            };
            writeln!(out, "{}", line)?;
        }

        let errors = issues.iter().filter(|i| i.is_error()).count();
        let warnings = issues.len() - errors;

        if issues.is_empty() {
            writeln!(
                out,
                "{}",
                theme.format_success(&format!("{} is valid", path.display()))
            )?;
            return Ok(CommandResult::success());
        }

        writeln!(
            out,
            "{}",
            theme
                .dim
                .apply_to(format!("{} error(s), {} warning(s)", errors, warnings))
        )?;

        if errors > 0 || (self.args.strict && warnings > 0) {
            Ok(CommandResult::failure(1))
        } else {
            Ok(CommandResult::success())
        }
    }
}
