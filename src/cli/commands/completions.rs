//! Shell completions generation.
//!
//! The `stepwise completions` command generates shell completion scripts.

use std::io::Write;

use async_trait::async_trait;
use clap::CommandFactory;

use crate::cli::args::{Cli, CompletionsArgs};
use crate::error::Result;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The completions command implementation.
pub struct CompletionsCommand {
    args: CompletionsArgs,
}

impl CompletionsCommand {
    pub fn new(args: CompletionsArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl Command for CompletionsCommand {
    async fn execute(
        &self,
        _ctx: &CommandContext,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        let mut cmd = Cli::command();
        clap_complete::generate(self.args.shell, &mut cmd, "stepwise", out);
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_complete::Shell;

    async fn generate(shell: Shell) -> String {
        let mut buf = Vec::new();
        CompletionsCommand::new(CompletionsArgs { shell })
            .execute(&CommandContext::new("."), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn generates_bash_completions() {
        let output = generate(Shell::Bash).await;
        assert!(output.contains("stepwise"));
        assert!(output.contains("complete"));
    }

    #[tokio::test]
    async fn generates_zsh_completions() {
        assert!(generate(Shell::Zsh).await.contains("stepwise"));
    }

    #[tokio::test]
    async fn generates_fish_completions() {
        assert!(generate(Shell::Fish).await.contains("stepwise"));
    }
}
