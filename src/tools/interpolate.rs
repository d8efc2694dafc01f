//! `{{name}}` placeholder substitution with value-safety checks.
//!
//! Shell templates are interpolated per token (see `handlers::shell`), URL
//! templates with percent-encoding. Either way each substituted value is
//! checked for missing, null-byte, and oversized input first.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Longest value (in characters) accepted for a single placeholder.
pub const MAX_VALUE_LENGTH: usize = 10_000;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpolationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Parameter {0} contains a null byte")]
    UnsafeValue(String),

    #[error("Parameter {0} exceeds maximum length of {MAX_VALUE_LENGTH} characters")]
    ValueTooLong(String),
}

/// Substitute every `{{name}}` in `template` with the raw argument value.
pub fn interpolate(template: &str, args: &serde_json::Value) -> Result<String, InterpolationError> {
    substitute(template, args, |value| value.to_string()).map(|(out, _)| out)
}

/// Substitute with percent-encoded values, returning the names consumed by the template.
pub fn interpolate_encoded(
    template: &str,
    args: &serde_json::Value,
) -> Result<(String, HashSet<String>), InterpolationError> {
    substitute(template, args, |value| urlencoding::encode(value).into_owned())
}

/// Names of all placeholders referenced by `template`.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Render an argument value as the text spliced into a template.
///
/// Strings are used verbatim; other JSON values use their JSON text.
pub fn stringify(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn substitute(
    template: &str,
    args: &serde_json::Value,
    encode: impl Fn(&str) -> String,
) -> Result<(String, HashSet<String>), InterpolationError> {
    let mut used = HashSet::new();
    let mut failure = None;

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        if failure.is_some() {
            return String::new();
        }
        match checked_value(name, args) {
            Ok(value) => {
                used.insert(name.to_string());
                encode(&value)
            }
            Err(e) => {
                failure = Some(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok((rendered.into_owned(), used)),
    }
}

fn checked_value(name: &str, args: &serde_json::Value) -> Result<String, InterpolationError> {
    let value = args
        .get(name)
        .and_then(stringify)
        .ok_or_else(|| InterpolationError::MissingParameter(name.to_string()))?;

    if value.contains('\0') {
        return Err(InterpolationError::UnsafeValue(name.to_string()));
    }
    if value.chars().count() > MAX_VALUE_LENGTH {
        return Err(InterpolationError::ValueTooLong(name.to_string()));
    }
    Ok(value)
}
