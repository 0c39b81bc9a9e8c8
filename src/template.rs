//! `{{variable}}` substitution for prompts and state messages.
//!
//! A placeholder may carry a default after a pipe, `{{owner|unassigned}}`, used when the
//! variable cannot be resolved. A placeholder with neither a value nor a default fails
//! with [`NodeExecutionError::MissingVariable`].

use crate::context::ExecutionContext;
use crate::error::NodeExecutionError;
use crate::value::display;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(?:\|([^}]*))?\}\}")
        .expect("placeholder pattern is valid")
});

/// Replaces every placeholder in `template` with its value from the context.
pub fn render(template: &str, ctx: &ExecutionContext) -> Result<String, NodeExecutionError> {
    let mut missing = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (ctx.resolve(name), caps.get(2)) {
            (Some(value), _) => display(value),
            (None, Some(default)) => default.as_str().trim().to_string(),
            (None, None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(NodeExecutionError::MissingVariable { name }),
        None => Ok(rendered.into_owned()),
    }
}

/// Variable names referenced by a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}
