//! Terminal presentation: themes, reporters, prompts, summaries.
//!
//! Nothing here influences a run; reporters only observe the event stream.

pub mod output;
pub mod prompts;
pub mod reporter;
pub mod summary;
pub mod theme;

pub use output::OutputMode;
pub use reporter::{step_label, PlainReporter, TerminalReporter};
pub use summary::{format_duration, summary_line};
pub use theme::{should_use_colors, Theme};
