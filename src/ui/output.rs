//! Output verbosity.

use std::str::FromStr;

/// How much the reporters print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Every transition, including each retry attempt.
    Verbose,
    /// One line per finished step plus retries and rollbacks.
    #[default]
    Normal,
    /// Failures and the final summary only.
    Quiet,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "normal" => Ok(Self::Normal),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("unknown output mode: {}", s)),
        }
    }
}

impl OutputMode {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Whether spinners and per-step lines are shown.
    pub fn shows_progress(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Whether every attempt is announced, not just the first.
    pub fn shows_attempts(&self) -> bool {
        matches!(self, Self::Verbose)
    }
}
