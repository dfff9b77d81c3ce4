//! Schema command implementation.
//!
//! The `stepwise schema` command prints the JSON schema of the workflow file
//! format, for editor integration.

use std::io::Write;

use async_trait::async_trait;

use crate::config::json_schema;
use crate::error::Result;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The schema command implementation.
pub struct SchemaCommand;

#[async_trait]
impl Command for SchemaCommand {
    async fn execute(
        &self,
        _ctx: &CommandContext,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        serde_json::to_writer_pretty(&mut *out, &json_schema()).map_err(anyhow::Error::from)?;
        writeln!(out)?;
        Ok(CommandResult::success())
    }
}
