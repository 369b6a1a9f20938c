//! JSON error diagnostics for operator-edited schema text

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// JSON syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("Invalid JSON: {message}")]
#[diagnostic(code(tdk::schema::json_syntax))]
pub struct JsonSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying error message
    message: String,

    line: usize,
    column: usize,
}

impl JsonSyntaxError {
    /// Create a syntax error from a serde_json error
    pub fn from_serde_error(err: &serde_json::Error, source: &str, filename: &str) -> Self {
        let line = err.line().max(1);
        let column = err.column().max(1);

        let offset = line_col_to_offset(source, line, column);
        let len = if offset < source.len() { 1 } else { 0 };
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset + len),
            help,
            message,
            line,
            column,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-based line of the error
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the error
    pub fn column(&self) -> usize {
        self.column
    }
}

/// Convert 1-based line/column to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;

    for (idx, text) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let col = text
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            return offset + col;
        }
        offset += text.len();
    }

    source.len()
}

/// Generate helpful suggestions based on error message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("trailing comma") {
        return Some("Remove the comma after the last item in the object or array".to_string());
    }

    if msg_lower.contains("key must be a string") {
        return Some("Object keys must be double-quoted: {\"name\": ...}".to_string());
    }

    if msg_lower.contains("eof while parsing") {
        return Some("A '{' or '[' is never closed. Check that brackets are balanced.".to_string());
    }

    if msg_lower.contains("expected `,` or `}`") || msg_lower.contains("expected `,` or `]`") {
        return Some("Add a comma between entries".to_string());
    }

    if msg_lower.contains("expected value") {
        return Some("Strings must use double quotes, not single quotes".to_string());
    }

    None
}
