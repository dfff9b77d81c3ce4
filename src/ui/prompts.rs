//! Interactive prompts.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

use crate::error::{Result, StepwiseError};

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Ask a free-text question on `term`.
///
/// Blocks until the user answers; call from a blocking context.
pub fn ask(key: &str, question: &str, default: Option<&str>, term: &Term) -> Result<String> {
    let theme = prompt_theme();
    let input = Input::<String>::with_theme(&theme).with_prompt(question);
    let input = match default {
        Some(default) => input.default(default.to_string()),
        None => input,
    };

    input
        .interact_on(term)
        .map_err(|e| StepwiseError::PromptFailed {
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// Environment variable that pre-answers the prompt for `key`.
///
/// `db-name` becomes `STEPWISE_PROMPT_DB_NAME`.
pub fn override_var(key: &str) -> String {
    let normalized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("STEPWISE_PROMPT_{}", normalized)
}
