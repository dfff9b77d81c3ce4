//! Visual theme and styling.

use console::Style;

use crate::steps::StepStatus;

/// Styles used by reporters and command output.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Succeeded steps (green).
    pub success: Style,
    /// Retries and compensations (orange).
    pub warning: Style,
    /// Failures (red bold).
    pub error: Style,
    /// Running elements (magenta).
    pub info: Style,
    /// Secondary text.
    pub dim: Style,
    pub highlight: Style,
    pub header: Style,
    /// Durations and counters.
    pub duration: Style,
    /// Commands shown in listings (dim italic).
    pub command: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().magenta(),
            duration: Style::new().dim(),
            command: Style::new().dim().italic(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            duration: Style::new(),
            command: Style::new(),
        }
    }

    /// Pick the colored or plain theme for the current terminal.
    pub fn detect() -> Self {
        if should_use_colors() {
            Self::new()
        } else {
            Self::plain()
        }
    }

    /// Style matching a step status.
    pub fn for_status(&self, status: StepStatus) -> &Style {
        match status {
            StepStatus::Started => &self.info,
            StepStatus::Succeeded => &self.success,
            StepStatus::Skipped => &self.dim,
            StepStatus::Retrying | StepStatus::RollbackSucceeded => &self.warning,
            StepStatus::Failed | StepStatus::RollbackFailed => &self.error,
        }
    }

    /// Icon plus text, styled for `status`.
    pub fn format_status(&self, status: StepStatus, msg: &str) -> String {
        format!(
            "{}",
            self.for_status(status)
                .apply_to(format!("{} {}", status.display_char(), msg))
        )
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Format a header banner.
    pub fn format_header(&self, title: &str) -> String {
        format!(
            "{} {}",
            self.header.apply_to("▸"),
            self.highlight.apply_to(title)
        )
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_formats_icons() {
        let theme = Theme::plain();
        assert_eq!(theme.format_success("done"), "✓ done");
        assert_eq!(theme.format_warning("careful"), "⚠ careful");
        assert_eq!(theme.format_error("broke"), "✗ broke");
        assert!(theme.format_header("demo").contains("demo"));
    }

    #[test]
    fn status_format_uses_status_icon() {
        let theme = Theme::plain();
        for status in StepStatus::ALL {
            let line = theme.format_status(status, "step");
            assert!(line.starts_with(status.display_char()));
            assert!(line.ends_with("step"));
        }
    }

    #[test]
    fn default_theme_creates_without_panic() {
        let theme = Theme::default();
        let _ = theme.format_status(StepStatus::Failed, "x");
    }
}
