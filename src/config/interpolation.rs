//! `${var}` interpolation for commands and prompt text.
//!
//! - `${name}` is replaced with the variable's value
//! - `$${name}` produces the literal text `${name}`
//! - a lone `$` is kept as-is
//!
//! Values are looked up when a step runs, so variables captured by earlier
//! steps are visible to later ones.

use std::collections::BTreeSet;

use crate::error::{Result, StepwiseError};

/// A piece of an interpolated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

/// Split `input` into literal and variable segments.
pub fn parse(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(at) = rest.find('$') {
        literal.push_str(&rest[..at]);
        let tail = &rest[at..];

        if let Some(escaped) = tail.strip_prefix("$${") {
            // Escaped reference: keep `${...}` verbatim.
            match escaped.find('}') {
                Some(end) => {
                    literal.push_str("${");
                    literal.push_str(&escaped[..=end]);
                    rest = &escaped[end + 1..];
                }
                None => {
                    literal.push_str("${");
                    literal.push_str(escaped);
                    rest = "";
                }
            }
        } else if let Some(body) = tail.strip_prefix("${") {
            match body.find('}') {
                Some(end) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(body[..end].trim().to_string()));
                    rest = &body[end + 1..];
                }
                None => {
                    // Unterminated reference is plain text.
                    literal.push_str(tail);
                    rest = "";
                }
            }
        } else {
            literal.push('$');
            rest = &tail[1..];
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Names referenced by `input`, sorted and de-duplicated.
pub fn variables(input: &str) -> BTreeSet<String> {
    parse(input)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect()
}

pub fn has_variables(input: &str) -> bool {
    parse(input)
        .iter()
        .any(|segment| matches!(segment, Segment::Variable(_)))
}

/// Substitute every reference in `input` using `lookup`.
///
/// # Errors
///
/// Returns [`StepwiseError::UnknownVariable`] for the first name `lookup`
/// cannot resolve.
pub fn resolve<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    for segment in parse(input) {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Variable(name) => match lookup(&name) {
                Some(value) => out.push_str(&value),
                None => return Err(StepwiseError::UnknownVariable { name }),
            },
        }
    }
    Ok(out)
}
