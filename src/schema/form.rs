//! Form engine - schema-driven field rendering, validation and coercion
//!
//! Every surface that renders a submission form goes through
//! [`fields_to_render`]; nothing else switches on field types.

use serde::Serialize;
use serde_json::Value;

use crate::entities::ListingData;
use crate::listing::normalize;
use crate::schema::model::{FieldType, SchemaModel};

/// Key/title fragments that suggest long free text
const LONG_TEXT_HINTS: &[&str] = &["description", "bio", "about"];

/// A field as the form should present it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderField {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Presentational hint only; never affects validation
    pub multiline: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Fields to render, in schema order
pub fn fields_to_render(schema: &SchemaModel) -> Vec<RenderField> {
    schema
        .fields()
        .iter()
        .map(|field| RenderField {
            key: field.key.clone(),
            field_type: field.field_type,
            title: field.title.clone(),
            description: field.description.clone(),
            required: schema.is_required(&field.key),
            multiline: is_multiline(field.field_type, &field.key, &field.title),
            options: field.options.clone(),
        })
        .collect()
}

fn is_multiline(field_type: FieldType, key: &str, title: &str) -> bool {
    match field_type {
        FieldType::Textarea => true,
        FieldType::String => {
            let key = key.to_lowercase();
            let title = title.to_lowercase();
            LONG_TEXT_HINTS
                .iter()
                .any(|hint| key.contains(hint) || title.contains(hint))
        }
        _ => false,
    }
}

/// Check every required field; returns all problems, never just the first
pub fn validate(schema: &SchemaModel, values: &ListingData) -> Vec<FieldError> {
    schema
        .fields()
        .iter()
        .filter(|field| schema.is_required(&field.key))
        .filter(|field| is_missing(values.get(&field.key)))
        .map(|field| FieldError {
            key: field.key.clone(),
            message: format!("{} is required", field.title),
        })
        .collect()
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        // Array form of a multi-value text field
        Some(v @ Value::Array(_)) => normalize::to_tokens(Some(v)).is_empty(),
        // Booleans and numbers count as present even when falsy
        Some(_) => false,
    }
}

/// Convert raw form input into the stored representation
///
/// Numbers stay as typed; numeric parsing belongs to the storage side.
pub fn coerce(field_type: FieldType, raw_input: &str) -> Value {
    match field_type {
        FieldType::Boolean => {
            let truthy = matches!(
                raw_input.trim().to_lowercase().as_str(),
                "true" | "yes" | "y" | "on" | "1"
            );
            Value::String(truthy.to_string())
        }
        _ => Value::String(raw_input.to_string()),
    }
}

/// Coerce an input for a key, using `string` for keys the schema lacks
pub fn coerce_for(schema: &SchemaModel, key: &str, raw_input: &str) -> Value {
    let field_type = schema
        .field(key)
        .map(|f| f.field_type)
        .unwrap_or_default();
    coerce(field_type, raw_input)
}

/// Merge incoming values (e.g. autofill) over the current ones.
///
/// Unknown keys are kept; they are simply not rendered.
pub fn merge_values(current: &ListingData, incoming: ListingData) -> ListingData {
    let mut merged = current.clone();
    for (key, value) in incoming {
        merged.insert(key, value);
    }
    merged
}

/// Prepare submitted values for storage: arrays become comma-joined text
///
/// An element that itself contains a comma reads back as several tokens.
pub fn prepare_for_storage(values: ListingData) -> ListingData {
    values
        .into_iter()
        .map(|(key, value)| match value {
            Value::Array(_) => {
                let joined = normalize::from_tokens(&normalize::to_tokens(Some(&value)));
                (key, Value::String(joined))
            }
            other => (key, other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(doc: Value) -> SchemaModel {
        SchemaModel::parse(&doc).unwrap()
    }

    fn data(v: Value) -> ListingData {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_render_order_and_required() {
        let s = schema(json!({
            "properties": {
                "name": {"type": "string", "title": "Name"},
                "website": {"type": "url"},
                "size": {"type": "integer"}
            },
            "required": ["name"]
        }));
        let fields = fields_to_render(&s);
        let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "website", "size"]);
        assert!(fields[0].required);
        assert!(!fields[1].required);
        assert_eq!(fields[1].field_type, FieldType::Url);
    }

    #[test]
    fn test_multiline_heuristic() {
        let s = schema(json!({
            "properties": {
                "shortDescription": {"type": "string"},
                "founder": {"type": "string", "title": "Founder Bio"},
                "aboutUrl": {"type": "url"},
                "notes": {"type": "textarea"},
                "name": {"type": "string"}
            }
        }));
        let multiline: Vec<bool> = fields_to_render(&s).iter().map(|f| f.multiline).collect();
        assert_eq!(multiline, vec![true, true, false, true, false]);
    }

    #[test]
    fn test_validate_empty_values() {
        let s = schema(json!({"properties": {"name": {"type": "string"}}, "required": ["name"]}));
        let errors = validate(&s, &ListingData::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, "name");
        assert_eq!(errors[0].message, "Name is required");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let s = schema(json!({
            "properties": {
                "name": {"type": "string", "title": "Organization"},
                "email": {"type": "email", "title": "Email"},
                "city": {"type": "string"}
            },
            "required": ["name", "email"]
        }));
        let errors = validate(&s, &data(json!({"name": "   ", "city": "Oslo"})));
        let keys: Vec<&str> = errors.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "email"]);
        assert_eq!(errors[0].message, "Organization is required");
    }

    #[test]
    fn test_validate_falsy_non_strings_are_present() {
        let s = schema(json!({
            "properties": {"remote": {"type": "boolean"}, "staff": {"type": "integer"}},
            "required": ["remote", "staff"]
        }));
        let errors = validate(&s, &data(json!({"remote": false, "staff": 0})));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_null_and_empty_array_missing() {
        let s = schema(json!({
            "properties": {"a": {}, "b": {}},
            "required": ["a", "b"]
        }));
        let errors = validate(&s, &data(json!({"a": null, "b": ["", " "]})));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validate_ignores_unknown_keys() {
        let s = schema(json!({"properties": {"name": {}}, "required": ["name"]}));
        let errors = validate(&s, &data(json!({"name": "Acme", "legacy": 1})));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(FieldType::Boolean, "Yes"), json!("true"));
        assert_eq!(coerce(FieldType::Boolean, "no"), json!("false"));
        assert_eq!(coerce(FieldType::Boolean, ""), json!("false"));
        assert_eq!(coerce(FieldType::Number, "12a"), json!("12a"));
        assert_eq!(coerce(FieldType::Integer, " 7 "), json!(" 7 "));
        assert_eq!(coerce(FieldType::Email, "a@b.c"), json!("a@b.c"));
    }

    #[test]
    fn test_coerce_for_unknown_key() {
        let s = schema(json!({"properties": {"remote": {"type": "boolean"}}}));
        assert_eq!(coerce_for(&s, "remote", "on"), json!("true"));
        assert_eq!(coerce_for(&s, "other", "on"), json!("on"));
    }

    #[test]
    fn test_merge_values_keeps_unknown_and_overrides() {
        let current = data(json!({"name": "Acme", "city": "Oslo"}));
        let incoming = data(json!({"city": "Bergen", "extra": "x"}));
        let merged = merge_values(&current, incoming);
        assert_eq!(merged.get("name"), Some(&json!("Acme")));
        assert_eq!(merged.get("city"), Some(&json!("Bergen")));
        assert_eq!(merged.get("extra"), Some(&json!("x")));
    }

    #[test]
    fn test_prepare_for_storage_joins_arrays() {
        let prepared = prepare_for_storage(data(json!({
            "focusAreas": ["Health", " Education", "Health"],
            "remote": "true"
        })));
        assert_eq!(prepared.get("focusAreas"), Some(&json!("Health, Education")));
        assert_eq!(prepared.get("remote"), Some(&json!("true")));
    }

    #[test]
    fn test_prepare_for_storage_splits_embedded_commas_on_read() {
        let prepared = prepare_for_storage(data(json!({
            "focusAreas": ["Arts, Culture", "Health"]
        })));
        assert_eq!(prepared.get("focusAreas"), Some(&json!("Arts, Culture, Health")));
        assert_eq!(
            normalize::to_tokens(prepared.get("focusAreas")),
            vec!["Arts", "Culture", "Health"]
        );
    }
}
