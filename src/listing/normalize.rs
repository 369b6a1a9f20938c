//! Value normalization for stored listing fields
//!
//! Multi-value fields were historically stored both as JSON arrays and as
//! comma-joined strings. Every reader goes through [`to_tokens`] so the two
//! representations behave identically.

use serde_json::Value;

/// Separator used when rejoining tokens for storage
pub const TOKEN_SEPARATOR: &str = ", ";

/// Convert a stored value into ordered, de-duplicated, non-empty tokens.
///
/// Dedupe is case-sensitive: `"A, a"` yields `["A", "a"]`.
pub fn to_tokens(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(element_text)
            .map(|s| s.trim().to_string())
            .collect(),
        Some(Value::String(s)) => s.split(',').map(|seg| seg.trim().to_string()).collect(),
        Some(Value::Bool(b)) => vec![b.to_string()],
        Some(Value::Number(n)) => vec![n.to_string()],
        // Nested objects are not a supported value shape
        Some(Value::Object(_)) => Vec::new(),
    };

    let mut tokens: Vec<String> = Vec::with_capacity(raw.len());
    for token in raw {
        if !token.is_empty() && !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Case-insensitive substring match of `needle` against any token.
///
/// This is intentionally loose: `"tech"` matches both `"Technology"` and
/// `"Biotech"`.
pub fn contains_token(value: Option<&Value>, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    to_tokens(value)
        .iter()
        .any(|token| token.to_lowercase().contains(&needle))
}

/// Rejoin tokens into the comma-joined storage form
pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(TOKEN_SEPARATOR)
}

/// Single-line display text for any stored value
pub fn display_value(value: Option<&Value>) -> String {
    from_tokens(&to_tokens(value))
}

fn element_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
