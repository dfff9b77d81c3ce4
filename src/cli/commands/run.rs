//! Run command implementation.
//!
//! The `stepwise run` command executes workflow groups, one after another by
//! default or all at once with `--concurrent`.

use std::io::Write;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::cli::args::RunArgs;
use crate::config::{self, Workflow};
use crate::error::Result;
use crate::runner::{
    ChannelSink, EventSink, Group, NullSink, RunOutcome, RunOutput, RunResult, Runner,
};
use crate::shell::{is_ci, ShellContext};
use crate::ui::{summary_line, PlainReporter, TerminalReporter};

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_CANCELLED};

/// The run command implementation.
pub struct RunCommand {
    args: RunArgs,
}

/// Result of one top-level group.
struct GroupReport {
    name: String,
    result: RunResult,
}

impl RunCommand {
    pub fn new(args: RunArgs) -> Self {
        Self { args }
    }

    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    fn base_context(
        &self,
        ctx: &CommandContext,
        workflow: &Workflow,
        config: &config::WorkflowConfig,
    ) -> ShellContext {
        let interactive = ctx.interactive && !self.args.non_interactive && !is_ci();
        ShellContext::new(workflow.name.clone(), &ctx.project_root)
            .with_vars(config.vars.clone())
            .with_env(config.env.clone())
            .interactive(interactive)
    }

    fn reporter<'o>(
        &self,
        ctx: &CommandContext,
        out: &'o mut (dyn Write + Send),
        with_root: bool,
    ) -> Box<dyn EventSink + 'o> {
        if self.args.json {
            return Box::new(NullSink);
        }
        if ctx.interactive && console::Term::stdout().is_term() {
            Box::new(TerminalReporter::new(ctx.theme.clone(), ctx.mode, with_root))
        } else {
            Box::new(PlainReporter::new(out, ctx.theme.clone(), ctx.mode, with_root))
        }
    }

    /// Run groups in order, passing the context along.
    ///
    /// Stops after the first group that does not complete.
    async fn run_sequential(
        &self,
        runner: &Runner,
        groups: &[&Group<ShellContext>],
        base: ShellContext,
        sink: &mut dyn EventSink,
    ) -> Result<(Vec<GroupReport>, Vec<String>)> {
        let mut context = base;
        let mut reports = Vec::new();

        for &group in groups {
            let RunOutput {
                result,
                context: after,
            } = runner.run(group, context, sink).await?;
            context = after;

            let stop = result.outcome != RunOutcome::Completed;
            reports.push(GroupReport {
                name: group.name().to_string(),
                result,
            });
            if stop {
                debug!(group = group.name(), "Stopping before remaining groups");
                break;
            }
        }

        Ok((reports, context.notices))
    }

    /// Run every group at once, each with its own copy of the context.
    async fn run_concurrent(
        &self,
        runner: &Runner,
        groups: &[&Group<ShellContext>],
        base: ShellContext,
        sink: &mut dyn EventSink,
    ) -> Result<(Vec<GroupReport>, Vec<String>)> {
        let (channel, mut rx) = ChannelSink::channel();
        let jobs = groups
            .iter()
            .map(|group| (*group, base.clone()))
            .collect::<Vec<_>>();

        let drain = async {
            while let Some(event) = rx.recv().await {
                sink.emit(&event);
            }
        };
        let (outputs, ()) = tokio::join!(runner.run_all(jobs, channel), drain);

        let mut notices = Vec::new();
        let reports = groups
            .iter()
            .zip(outputs?)
            .map(|(group, output)| {
                notices.extend(output.context.notices);
                GroupReport {
                    name: group.name().to_string(),
                    result: output.result,
                }
            })
            .collect();
        Ok((reports, notices))
    }

    fn write_summary(
        &self,
        ctx: &CommandContext,
        out: &mut (dyn Write + Send),
        reports: &[GroupReport],
        skipped: &[&str],
        notices: &[String],
    ) -> Result<()> {
        writeln!(out)?;
        for report in reports {
            writeln!(out, "{}", summary_line(&report.name, &report.result, &ctx.theme))?;
            let failed = report.result.rollback_failures();
            if failed > 0 {
                writeln!(
                    out,
                    "  {}",
                    ctx.theme
                        .format_warning(&format!("{} rollback(s) failed", failed))
                )?;
            }
        }
        if !skipped.is_empty() {
            writeln!(
                out,
                "{}",
                ctx.theme.dim.apply_to(format!("Not started: {}", skipped.join(", ")))
            )?;
        }
        for notice in notices {
            writeln!(out, "{}", ctx.theme.info.apply_to(notice))?;
        }
        Ok(())
    }

    fn write_json(
        &self,
        out: &mut (dyn Write + Send),
        workflow: &str,
        reports: &[GroupReport],
        notices: &[String],
    ) -> Result<()> {
        let groups = reports
            .iter()
            .map(|r| json!({ "name": r.name, "result": r.result }))
            .collect::<Vec<_>>();
        let report = json!({
            "workflow": workflow,
            "groups": groups,
            "notices": notices,
        });
        serde_json::to_writer_pretty(&mut *out, &report).map_err(anyhow::Error::from)?;
        writeln!(out)?;
        Ok(())
    }
}

#[async_trait]
impl Command for RunCommand {
    async fn execute(
        &self,
        ctx: &CommandContext,
        out: &mut (dyn Write + Send),
    ) -> Result<CommandResult> {
        let (path, mut config) = config::load(&ctx.project_root, ctx.config_path())?;
        debug!(path = %path.display(), "Loaded workflow file");
        for (key, value) in &self.args.vars {
            config.vars.insert(key.clone(), value.clone());
        }

        let workflow = config::build(&config, &ctx.project_name())?;
        let groups = workflow.select(&self.args.groups)?;
        if groups.is_empty() {
            writeln!(out, "{}", ctx.theme.format_warning("No groups to run"))?;
            return Ok(CommandResult::success());
        }

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling run");
                    cancel.cancel();
                }
            }
        });

        let mut options = workflow.options.clone().with_cancellation(cancel);
        if self.args.no_logs {
            options = options.without_logs();
        }
        let runner = Runner::new(options);
        let base = self.base_context(ctx, &workflow, &config);
        let concurrent = self.args.concurrent || workflow.concurrent;

        if !self.args.json && ctx.mode.shows_progress() {
            writeln!(out, "{}", ctx.theme.format_header(&workflow.name))?;
        }

        let outcome = {
            let mut sink = self.reporter(ctx, &mut *out, concurrent && groups.len() > 1);
            if concurrent {
                self.run_concurrent(&runner, &groups, base, &mut *sink).await
            } else {
                self.run_sequential(&runner, &groups, base, &mut *sink).await
            }
        };
        watcher.abort();
        let (reports, notices) = outcome?;

        if self.args.json {
            self.write_json(out, &workflow.name, &reports, &notices)?;
        } else {
            let skipped = groups[reports.len()..]
                .iter()
                .map(|g| g.name())
                .collect::<Vec<_>>();
            self.write_summary(ctx, out, &reports, &skipped, &notices)?;
        }

        let cancelled = reports
            .iter()
            .any(|r| r.result.outcome == RunOutcome::Cancelled);
        let succeeded = reports.len() == groups.len() && reports.iter().all(|r| r.result.is_success());

        Ok(if cancelled {
            CommandResult::failure(EXIT_CANCELLED)
        } else if succeeded {
            CommandResult::success()
        } else {
            CommandResult::failure(1)
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ui::{OutputMode, Theme};
    use tempfile::TempDir;

    fn project(yaml: &str) -> (TempDir, CommandContext) {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("stepwise.yml"), yaml).unwrap();
        let mut ctx = CommandContext::new(temp.path());
        ctx.theme = Theme::plain();
        ctx.mode = OutputMode::Normal;
        (temp, ctx)
    }

    async fn run(ctx: &CommandContext, args: RunArgs) -> (CommandResult, String) {
        let mut out = Vec::new();
        let result = RunCommand::new(args).execute(ctx, &mut out).await.unwrap();
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn runs_all_groups_in_order() {
        let (_temp, ctx) = project(
            r#"
name: demo
groups:
  - name: first
    steps:
      - { key: a, run: "true" }
  - name: second
    on_submit: "all done"
    steps:
      - { key: b, run: "true" }
"#,
        );
        let (result, out) = run(&ctx, RunArgs::default()).await;
        assert!(result.success);
        assert!(out.contains("✓ first completed"));
        assert!(out.contains("✓ second completed"));
        assert!(out.contains("all done"));
    }

    #[tokio::test]
    async fn failure_rolls_back_and_stops() {
        let (_temp, ctx) = project(
            r#"
groups:
  - name: first
    steps:
      - { key: a, run: "true", rollback: "true" }
      - { key: b, run: "false" }
  - name: second
    steps:
      - { key: c, run: "true" }
"#,
        );
        let (result, out) = run(&ctx, RunArgs::default()).await;
        assert_eq!(result.exit_code, 1);
        assert!(out.contains("↶ a rolled back"));
        assert!(out.contains("✗ first rolled back"));
        assert!(out.contains("Not started: second"));
    }

    #[tokio::test]
    async fn captured_output_flows_to_later_groups() {
        let (_temp, ctx) = project(
            r#"
groups:
  - name: first
    steps:
      - { key: a, run: "echo v1", capture: version }
  - name: second
    steps:
      - { key: b, run: "test '${version}' = v1" }
"#,
        );
        let (result, _) = run(&ctx, RunArgs::default()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn var_overrides_apply() {
        let (_temp, ctx) = project(
            "vars: { target: dev }\ngroups:\n  - name: g\n    steps:\n      - { key: a, run: \"test ${target} = prod\" }\n",
        );
        let args = RunArgs {
            vars: vec![("target".to_string(), "prod".to_string())],
            ..Default::default()
        };
        let (result, _) = run(&ctx, args).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn json_report_lists_groups() {
        let (_temp, ctx) = project(
            "name: demo\ngroups:\n  - name: g\n    steps:\n      - { key: a, run: 'true' }\n",
        );
        let args = RunArgs {
            json: true,
            ..Default::default()
        };
        let (result, out) = run(&ctx, args).await;
        assert!(result.success);
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(report["workflow"], "demo");
        assert_eq!(report["groups"][0]["name"], "g");
        assert_eq!(report["groups"][0]["result"]["outcome"], "completed");
        assert_eq!(report["groups"][0]["result"]["succeeded"], 1);
    }

    #[tokio::test]
    async fn concurrent_groups_keep_separate_results() {
        let (_temp, ctx) = project(
            r#"
groups:
  - name: ok
    steps:
      - { key: a, run: "true" }
  - name: broken
    steps:
      - { key: b, run: "false" }
"#,
        );
        let args = RunArgs {
            concurrent: true,
            json: true,
            ..Default::default()
        };
        let (result, out) = run(&ctx, args).await;
        assert_eq!(result.exit_code, 1);
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(report["groups"][0]["result"]["outcome"], "completed");
        assert_eq!(report["groups"][1]["result"]["outcome"], "rolled_back");
    }

    #[tokio::test]
    async fn unknown_group_is_an_error() {
        let (_temp, ctx) = project("groups:\n  - name: g\n");
        let args = RunArgs {
            groups: vec!["nope".to_string()],
            ..Default::default()
        };
        let mut out = Vec::new();
        let err = RunCommand::new(args)
            .execute(&ctx, &mut out)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
