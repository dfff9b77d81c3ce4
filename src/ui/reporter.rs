//! Event sinks that render a run for humans.
//!
//! [`TerminalReporter`] draws one spinner per running step on an interactive
//! terminal; [`PlainReporter`] writes one line per transition and is used in
//! CI, with `--non-interactive`, and in tests.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::runner::{EventSink, RunEvent};
use crate::steps::StepStatus;

use super::output::OutputMode;
use super::theme::Theme;

/// Display label for an event's step.
///
/// The root group name is dropped unless `with_root` is set, which the CLI
/// does when several groups report at once.
pub fn step_label(event: &RunEvent, with_root: bool) -> String {
    let skip = usize::from(!with_root && event.task_path.len() > 1);
    event.task_path[skip..].join("/")
}

/// Spinner-per-step reporter for interactive terminals.
pub struct TerminalReporter {
    multi: MultiProgress,
    bars: HashMap<Vec<String>, ProgressBar>,
    theme: Theme,
    mode: OutputMode,
    with_root: bool,
}

impl TerminalReporter {
    pub fn new(theme: Theme, mode: OutputMode, with_root: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
            theme,
            mode,
            with_root,
        }
    }

    fn spinner(&self, indent: usize, message: String) -> ProgressBar {
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template(&format!("{}{{spinner:.magenta}} {{msg}}", " ".repeat(indent)))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(style);
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn finish(&mut self, event: &RunEvent, line: String) {
        let indent = " ".repeat(event.depth() * 2);
        match self.bars.remove(&event.task_path) {
            Some(bar) => {
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.finish_with_message(format!("{}{}", indent, line));
            }
            None => {
                let _ = self.multi.println(format!("{}{}", indent, line));
            }
        }
    }
}

impl EventSink for TerminalReporter {
    fn emit(&mut self, event: &RunEvent) {
        let label = step_label(event, self.with_root);
        let detail = event.message.clone().unwrap_or_default();

        match event.status {
            StepStatus::Started => {
                if !self.mode.shows_progress() {
                    return;
                }
                let text = if detail.is_empty() || detail == "Started" {
                    label
                } else {
                    format!("{} {}", label, self.theme.dim.apply_to(format!("({})", detail)))
                };
                match self.bars.get(&event.task_path) {
                    Some(bar) => bar.set_message(text),
                    None => {
                        let bar = self.spinner(event.depth() * 2, text);
                        self.bars.insert(event.task_path.clone(), bar);
                    }
                }
            }
            StepStatus::Retrying => {
                if let Some(bar) = self.bars.get(&event.task_path) {
                    bar.set_message(format!(
                        "{} {}",
                        label,
                        self.theme.warning.apply_to(&detail)
                    ));
                }
            }
            StepStatus::Succeeded | StepStatus::Skipped | StepStatus::RollbackSucceeded => {
                if !self.mode.shows_progress() {
                    self.bars.remove(&event.task_path);
                    return;
                }
                let text = match event.status {
                    StepStatus::Skipped => format!("{} ({})", label, detail),
                    StepStatus::RollbackSucceeded => format!("{} rolled back", label),
                    _ => label,
                };
                let line = self.theme.format_status(event.status, &text);
                self.finish(event, line);
            }
            StepStatus::Failed | StepStatus::RollbackFailed => {
                let line = self
                    .theme
                    .format_status(event.status, &format!("{}: {}", label, detail));
                self.finish(event, line);
            }
        }
    }
}

impl Drop for TerminalReporter {
    fn drop(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.finish_and_clear();
        }
    }
}

/// Line-per-transition reporter.
pub struct PlainReporter<W: Write + Send> {
    out: W,
    theme: Theme,
    mode: OutputMode,
    with_root: bool,
}

impl<W: Write + Send> PlainReporter<W> {
    pub fn new(out: W, theme: Theme, mode: OutputMode, with_root: bool) -> Self {
        Self {
            out,
            theme,
            mode,
            with_root,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&self, event: &RunEvent) -> Option<String> {
        let label = step_label(event, self.with_root);
        let detail = event.message.as_deref().unwrap_or_default();
        let progress = self.mode.shows_progress();

        let text = match event.status {
            StepStatus::Started if progress && (self.mode.shows_attempts() || detail == "Started") => {
                if detail == "Started" {
                    label
                } else {
                    format!("{} ({})", label, detail)
                }
            }
            StepStatus::Retrying if progress => format!("{}: {}", label, detail),
            StepStatus::Succeeded if progress => label,
            StepStatus::Skipped if progress => format!("{} ({})", label, detail),
            StepStatus::RollbackSucceeded if progress => format!("{} rolled back", label),
            StepStatus::Failed | StepStatus::RollbackFailed => format!("{}: {}", label, detail),
            _ => return None,
        };

        let indent = " ".repeat(event.depth() * 2);
        Some(format!("{}{}", indent, self.theme.format_status(event.status, &text)))
    }
}

impl<W: Write + Send> EventSink for PlainReporter<W> {
    fn emit(&mut self, event: &RunEvent) {
        if let Some(line) = self.line(event) {
            // Reporting never fails a run.
            let _ = writeln!(self.out, "{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: StepStatus, path: &[&str], message: &str) -> RunEvent {
        RunEvent::new(
            status,
            path.iter().map(|s| s.to_string()).collect(),
            Some(message.to_string()),
        )
    }

    fn render(mode: OutputMode, events: &[RunEvent]) -> String {
        let mut reporter = PlainReporter::new(Vec::new(), Theme::plain(), mode, false);
        for e in events {
            reporter.emit(e);
        }
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn scenario() -> Vec<RunEvent> {
        vec![
            event(StepStatus::Started, &["g", "a"], "Started"),
            event(StepStatus::Succeeded, &["g", "a"], "Succeeded"),
            event(StepStatus::Started, &["g", "b"], "Started"),
            event(StepStatus::Retrying, &["g", "b"], "Attempt 1 failed: boom"),
            event(StepStatus::Started, &["g", "b"], "Attempt 2 of 2"),
            event(StepStatus::Failed, &["g", "b"], "boom"),
            event(StepStatus::RollbackSucceeded, &["g", "a"], "Rolled back"),
        ]
    }

    #[test]
    fn label_drops_root_group() {
        let e = event(StepStatus::Started, &["deploy", "db", "migrate"], "");
        assert_eq!(step_label(&e, false), "db/migrate");
        assert_eq!(step_label(&e, true), "deploy/db/migrate");
    }

    #[test]
    fn normal_mode_prints_outcomes() {
        let out = render(OutputMode::Normal, &scenario());
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "◉ a",
                "✓ a",
                "◉ b",
                "↻ b: Attempt 1 failed: boom",
                "✗ b: boom",
                "↶ a rolled back",
            ]
        );
    }

    #[test]
    fn verbose_mode_prints_every_attempt() {
        let out = render(OutputMode::Verbose, &scenario());
        assert!(out.contains("◉ b (Attempt 2 of 2)"));
    }

    #[test]
    fn quiet_mode_prints_failures_only() {
        let out = render(OutputMode::Quiet, &scenario());
        assert_eq!(out.trim(), "✗ b: boom");
    }

    #[test]
    fn nested_steps_are_indented() {
        let out = render(
            OutputMode::Normal,
            &[event(StepStatus::Skipped, &["g", "inner", "x"], "Skipped: run cancelled")],
        );
        assert_eq!(out, "  ○ inner/x (Skipped: run cancelled)\n");
    }
}
