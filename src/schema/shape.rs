//! Structural gate for raw schema documents
//!
//! Only the handful of keys the directory engine reads are checked here:
//! the root must be an object, `properties` an object and `required` an
//! array of strings. Everything inside a property is read leniently later.

use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator};
use serde_json::{json, Value};
use std::sync::OnceLock;

/// A single structural problem in a schema document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeViolation {
    /// JSON pointer of the offending value ("" for the document root)
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "document root: {}", self.message)
        } else {
            write!(f, "'{}': {}", self.path, self.message)
        }
    }
}

/// Meta-schema describing the accepted document shape
fn meta_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "properties": {
                "type": ["object", "null"]
            },
            "required": {
                "type": ["array", "null"],
                "items": { "type": "string" }
            }
        }
    })
}

/// Compiled meta-schema, built on first use
fn meta_validator() -> Option<&'static Validator> {
    static META: OnceLock<Option<Validator>> = OnceLock::new();
    META.get_or_init(|| match validator_for(&meta_schema()) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "schema meta-schema failed to compile; skipping shape check");
            None
        }
    })
    .as_ref()
}

/// Check a raw document against the meta-schema, collecting every violation
pub fn check(raw: &Value) -> Vec<ShapeViolation> {
    let Some(validator) = meta_validator() else {
        return Vec::new();
    };

    validator
        .iter_errors(raw)
        .map(|e| error_to_violation(&e))
        .collect()
}

fn error_to_violation(error: &JsonSchemaError) -> ShapeViolation {
    let path = error.instance_path.to_string();
    let message = match path.as_str() {
        "/properties" => "must be an object mapping field keys to field definitions".to_string(),
        "/required" => "must be an array of field keys".to_string(),
        p if p.starts_with("/required/") => "required entries must be strings".to_string(),
        "" => "schema must be a JSON object".to_string(),
        _ => error.to_string(),
    };

    ShapeViolation { path, message }
}
