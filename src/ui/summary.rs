//! End-of-run summaries.

use std::time::Duration;

use crate::runner::{RunOutcome, RunResult};

use super::theme::Theme;

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// One line describing how a group invocation ended.
pub fn summary_line(group: &str, result: &RunResult, theme: &Theme) -> String {
    let mut counts = format!(
        "{} succeeded, {} failed, {} skipped",
        result.succeeded, result.failed, result.skipped
    );
    if result.not_run > 0 {
        counts.push_str(&format!(", {} not run", result.not_run));
    }
    let took = theme
        .duration
        .apply_to(format!("in {}", format_duration(Duration::from_millis(result.duration_ms))));

    let headline = format!("{} {}", group, result.outcome);
    let styled = match result.outcome {
        RunOutcome::Completed if result.failed == 0 => theme.format_success(&headline),
        RunOutcome::Completed => theme.format_warning(&headline),
        RunOutcome::RolledBack | RunOutcome::Cancelled => theme.format_error(&headline),
    };
    format!("{} {} ({})", styled, took, counts)
}
