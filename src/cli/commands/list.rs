//! List command implementation.
//!
//! The `stepwise list` command shows groups and steps with what each step
//! can do.

use std::io::Write;

use async_trait::async_trait;
use serde::Serialize;

use crate::cli::args::ListArgs;
use crate::config::{self, EntryConfig, GroupConfig, StepConfig};
use crate::error::Result;
use crate::ui::Theme;

use super::dispatcher::{Command, CommandContext, CommandResult};

/// The list command implementation.
pub struct ListCommand {
    args: ListArgs,
}

impl ListCommand {
    pub fn new(args: ListArgs) -> Self {
        Self { args }
    }

    pub fn args(&self) -> &ListArgs {
        &self.args
    }
}

#[derive(Debug, Serialize)]
struct ListedGroup {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retries: Option<i64>,
    entries: Vec<ListedEntry>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ListedEntry {
    Step {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        capabilities: Vec<&'static str>,
    },
    Group(ListedGroup),
}

/// Short names for what a step declares.
fn capabilities(step: &StepConfig) -> Vec<&'static str> {
    let mut caps = Vec::new();
    if step.run.is_some() {
        caps.push("run");
    }
    if step.prompt.is_some() {
        caps.push("prompt");
    }
    if step.when.is_some() {
        caps.push("guard");
    }
    if step.rollback.is_some() {
        caps.push("rollback");
    }
    if step.retries.is_some() {
        caps.push("retries");
    }
    if step.timeout_secs.is_some() {
        caps.push("timeout");
    }
    if step.capture.is_some() {
        caps.push("capture");
    }
    caps
}

fn listed(group: &GroupConfig) -> ListedGroup {
    ListedGroup {
        name: group.name.clone(),
        description: group.description.clone(),
        retries: group.retries,
        entries: group
            .steps
            .iter()
            .map(|entry| match entry {
                EntryConfig::Step(step) => ListedEntry::Step {
                    key: step.key.clone(),
                    description: step.description.clone(),
                    capabilities: capabilities(step),
                },
                EntryConfig::Group(nested) => ListedEntry::Group(listed(&nested.group)),
            })
            .collect(),
    }
}

fn write_group(
    out: &mut (dyn Write + Send),
    theme: &Theme,
    group: &ListedGroup,
    depth: usize,
) -> std::io::Result<()> {
    let indent = "  ".repeat(depth);
    let mut line = format!("{}{}", indent, theme.highlight.apply_to(&group.name));
    if let Some(desc) = &group.description {
        line.push_str(&format!(" {}", theme.dim.apply_to(format!("- {}", desc))));
    }
    writeln!(out, "{}", line)?;

    for entry in &group.entries {
        match entry {
            ListedEntry::Step {
                key,
                description,
                capabilities,
            } => {
                let mut line = format!("{}  {}", indent, key);
                if !capabilities.is_empty() {
                    line.push_str(&format!(
                        " {}",
                        theme.dim.apply_to(format!("[{}]", capabilities.join(", ")))
                    ));
                }
                if let Some(desc) = description {
                    line.push_str(&format!(" {}", desc));
                }
                writeln!(out, "{}", line)?;
            }
            ListedEntry::Group(nested) => write_group(out, theme, nested, depth + 1)?,
        }
    }
    Ok(())
}

#[async_trait]
impl Command for ListCommand {
    async fn execute(
        &self,
        ctx: &CommandContext,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        let (_, config) = config::load(&ctx.project_root, ctx.config_path())?;
        let groups = config.groups.iter().map(listed).collect::<Vec<_>>();

        if self.args.json {
            serde_json::to_writer_pretty(&mut *out, &groups).map_err(anyhow::Error::from)?;
            writeln!(out)?;
            return Ok(CommandResult::success());
        }

        let name = config.name.clone().unwrap_or_else(|| ctx.project_name());
        writeln!(out, "{}", ctx.theme.format_header(&name))?;
        if groups.is_empty() {
            writeln!(out, "  {}", ctx.theme.dim.apply_to("(no groups)"))?;
        }
        for group in &groups {
            write_group(out, &ctx.theme, group, 1)?;
        }
        Ok(CommandResult::success())
    }
}
