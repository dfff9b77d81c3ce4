//! Init command implementation.
//!
//! The `stepwise init` command writes a starter `stepwise.yml`.

use std::io::Write;

use async_trait::async_trait;

use crate::cli::args::InitArgs;
use crate::error::Result;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// Starter workflow written by `stepwise init`.
pub const STARTER_WORKFLOW: &str = r#"# Stepwise workflow
#
# Groups run in order. When a step fails after its retries, the steps that
# already succeeded in the same group are rolled back in reverse order.

name: ${name}

settings:
  retries: 1
  retry_delay_ms: 500

vars:
  greeting: hello

groups:
  - name: setup
    description: Prepare the workspace
    on_submit: "Workspace ready"
    steps:
      - key: workdir
        run: "mkdir -p .stepwise/tmp"
        rollback: "rm -rf .stepwise/tmp"
      - key: hello
        run: "echo ${greeting} from ${workflow}"
        when: "test -d .stepwise/tmp"
"#;

/// The init command implementation.
pub struct InitCommand {
    args: InitArgs,
}

impl InitCommand {
    pub fn new(args: InitArgs) -> Self {
        Self { args }
    }

    pub fn args(&self) -> &InitArgs {
        &self.args
    }

    /// Starter content with the project name filled in.
    fn render(project: &str) -> String {
        STARTER_WORKFLOW.replacen("${name}", project, 1)
    }
}

#[async_trait]
impl Command for InitCommand {
    async fn execute(
        &self,
        ctx: &CommandContext,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        let path = ctx
            .config_path()
            .map(|p| ctx.project_root.join(p))
            .unwrap_or_else(|| ctx.project_root.join("stepwise.yml"));

        if path.exists() && !self.args.force {
            writeln!(
                out,
                "{}",
                ctx.theme.format_error(&format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ))
            )?;
            return Ok(CommandResult::failure(1));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Self::render(&ctx.project_name()))?;
        writeln!(
            out,
            "{}",
            ctx.theme
                .format_success(&format!("Created {}", path.display()))
        )?;
        Ok(CommandResult::success())
    }
}
