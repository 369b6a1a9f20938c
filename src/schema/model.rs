//! Schema model - the normalized field definitions governing a directory
//!
//! Schema documents are machine-generated, so parsing is deliberately
//! forgiving about everything except structure and the required set:
//! unknown field types degrade to `string`, missing titles are derived from
//! the key, but a `required` key that is not declared in `properties` fails
//! the whole document.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::schema::diagnostics::JsonSyntaxError;
use crate::schema::shape::{self, ShapeViolation};

/// Supported field type vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Email,
    Url,
    /// Long free text; a rendering hint, validated like `string`
    Textarea,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Textarea => "textarea",
        }
    }

    pub fn all() -> &'static [FieldType] {
        &[
            FieldType::String,
            FieldType::Number,
            FieldType::Integer,
            FieldType::Boolean,
            FieldType::Email,
            FieldType::Url,
            FieldType::Textarea,
        ]
    }

    /// Resolve a declared `type` (and optional JSON Schema `format`).
    ///
    /// Returns `None` for type names outside the vocabulary.
    pub fn from_declared(type_name: &str, format: Option<&str>) -> Option<Self> {
        let format = format.map(|f| f.trim().to_lowercase());
        match type_name.trim().to_lowercase().as_str() {
            "string" => Some(match format.as_deref() {
                Some("email") => FieldType::Email,
                Some("uri") | Some("url") | Some("iri") => FieldType::Url,
                Some("textarea") => FieldType::Textarea,
                _ => FieldType::String,
            }),
            "number" => Some(FieldType::Number),
            "integer" => Some(FieldType::Integer),
            "boolean" => Some(FieldType::Boolean),
            "email" => Some(FieldType::Email),
            "url" | "uri" => Some(FieldType::Url),
            "textarea" => Some(FieldType::Textarea),
            _ => None,
        }
    }

    /// Whether values of this type are free text
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Email | FieldType::Url | FieldType::Textarea
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::from_declared(s, None).ok_or_else(|| format!("Unknown field type: {}", s))
    }
}

/// One field definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: String,
    pub field_type: FieldType,
    pub title: String,
    pub description: Option<String>,
    /// Suggested values from an `enum` list (not enforced)
    pub options: Vec<String>,
}

impl FieldSpec {
    /// Build a field from its raw definition. The second value is the declared
    /// type name when it was outside the vocabulary and had to be coerced.
    fn from_definition(key: &str, definition: &Value) -> (Self, Option<String>) {
        let title = match humanize_key(key) {
            t if t.is_empty() => key.to_string(),
            t => t,
        };
        let mut field = FieldSpec {
            key: key.to_string(),
            field_type: FieldType::String,
            title,
            description: None,
            options: Vec::new(),
        };

        let (declared, format) = match definition {
            // "website": "url" shorthand
            Value::String(s) => (Some(s.clone()), None),
            Value::Object(map) => {
                if let Some(title) = non_empty_str(map.get("title")) {
                    field.title = title;
                }
                field.description = non_empty_str(map.get("description"));
                field.options = map
                    .get("enum")
                    .and_then(|e| e.as_array())
                    .map(|values| values.iter().filter_map(scalar_to_string).collect())
                    .unwrap_or_default();
                (
                    declared_type(map.get("type")),
                    map.get("format").and_then(|f| f.as_str()).map(String::from),
                )
            }
            _ => (None, None),
        };

        let mut coerced = None;
        if let Some(declared) = declared {
            match FieldType::from_declared(&declared, format.as_deref()) {
                Some(t) => field.field_type = t,
                None => coerced = Some(declared),
            }
        }

        (field, coerced)
    }

    /// Serialize back to a definition that re-parses to the same field
    fn to_definition(&self) -> Value {
        let mut def = Map::new();
        def.insert("type".into(), Value::String(self.field_type.as_str().into()));
        def.insert("title".into(), Value::String(self.title.clone()));
        if let Some(ref desc) = self.description {
            def.insert("description".into(), Value::String(desc.clone()));
        }
        if !self.options.is_empty() {
            def.insert(
                "enum".into(),
                Value::Array(self.options.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(def)
    }
}

/// A declared type that was outside the vocabulary and became `string`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coercion {
    pub key: String,
    pub declared: String,
}

/// Parsed, validated schema. Immutable; edits produce a new instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaModel {
    fields: Vec<FieldSpec>,
    required: Vec<String>,
    coercions: Vec<Coercion>,
}

/// Errors from parsing a schema document
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Schema document must be a JSON object, found {found}")]
    #[diagnostic(code(tdk::schema::not_an_object))]
    NotAnObject { found: &'static str },

    #[error("Malformed schema document: {}", format_violations(.violations))]
    #[diagnostic(
        code(tdk::schema::malformed),
        help("Expected an object with a 'properties' object and a 'required' array of keys")
    )]
    Malformed { violations: Vec<ShapeViolation> },

    #[error("Required field '{field}' is not defined in properties")]
    #[diagnostic(
        code(tdk::schema::dangling_required),
        help("Define the field under 'properties' or remove it from 'required'")
    )]
    DanglingRequiredField { field: String },
}

/// Errors from parsing schema text (JSON syntax first, then the document)
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaTextError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Json(Box<JsonSyntaxError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}

impl SchemaModel {
    /// Schema with no fields
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a raw schema document
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let Some(doc) = raw.as_object() else {
            return Err(ParseError::NotAnObject {
                found: json_type_name(raw),
            });
        };

        let violations = shape::check(raw);
        if !violations.is_empty() {
            return Err(ParseError::Malformed { violations });
        }

        let mut model = SchemaModel::default();

        if let Some(props) = doc.get("properties").and_then(|p| p.as_object()) {
            for (key, definition) in props {
                let (field, coerced) = FieldSpec::from_definition(key, definition);
                if let Some(declared) = coerced {
                    tracing::warn!(field = %key, declared = %declared, "unknown field type, using string");
                    model.coercions.push(Coercion {
                        key: key.clone(),
                        declared,
                    });
                }
                model.fields.push(field);
            }
        }

        if let Some(required) = doc.get("required").and_then(|r| r.as_array()) {
            for key in required.iter().filter_map(|k| k.as_str()) {
                if model.field(key).is_none() {
                    return Err(ParseError::DanglingRequiredField {
                        field: key.to_string(),
                    });
                }
                if !model.required.iter().any(|k| k == key) {
                    model.required.push(key.to_string());
                }
            }
        }

        Ok(model)
    }

    /// Parse JSON text (as typed by an operator) into a schema
    pub fn parse_str(text: &str) -> Result<Self, SchemaTextError> {
        Self::parse_named(text, "schema.json")
    }

    /// Like [`SchemaModel::parse_str`], naming the source in diagnostics
    pub fn parse_named(text: &str, name: &str) -> Result<Self, SchemaTextError> {
        let raw: Value = serde_json::from_str(text).map_err(|e| {
            SchemaTextError::Json(Box::new(JsonSyntaxError::from_serde_error(&e, text, name)))
        })?;
        Ok(Self::parse(&raw)?)
    }

    /// Field keys in the author's order
    pub fn field_order(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Required keys, in the order the document listed them
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.required.iter().any(|k| k == key)
    }

    /// Fields whose declared type was replaced by `string`
    pub fn coercions(&self) -> &[Coercion] {
        &self.coercions
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Title for a key, falling back to a humanized key for undeclared fields
    pub fn title_for(&self, key: &str) -> String {
        self.field(key)
            .map(|f| f.title.clone())
            .unwrap_or_else(|| humanize_key(key))
    }

    /// Normalized document suitable for storage and re-editing
    pub fn to_document(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.key.clone(), f.to_definition()))
            .collect();

        json!({
            "properties": properties,
            "required": self.required,
        })
    }
}

impl From<SchemaModel> for Value {
    fn from(model: SchemaModel) -> Self {
        model.to_document()
    }
}

impl TryFrom<Value> for SchemaModel {
    type Error = ParseError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        SchemaModel::parse(&value)
    }
}

impl Serialize for SchemaModel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_document().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaModel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        SchemaModel::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Turn a field key into a display title: `focusAreas` -> `Focus Areas`
pub fn humanize_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '_' || c == '-' {
            spaced.push(' ');
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        spaced.push(c);
    }

    spaced
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn declared_type(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        // ["string", "null"] style unions: first non-null member
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .find(|s| *s != "null")
            .map(String::from),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn format_violations(violations: &[ShapeViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org_schema() -> Value {
        json!({
            "properties": {
                "name": {"type": "string", "title": "Name"},
                "focusAreas": {"type": "string", "title": "Focus Areas"},
                "website": {"type": "string", "format": "uri"},
                "founded": {"type": "integer", "description": "Year founded"},
                "contact_email": {"type": "email"},
                "remote": {"type": "boolean", "title": "Remote friendly"}
            },
            "required": ["name"]
        })
    }

    #[test]
    fn test_field_order_is_insertion_order() {
        let schema = SchemaModel::parse(&org_schema()).unwrap();
        assert_eq!(
            schema.field_order(),
            vec!["name", "focusAreas", "website", "founded", "contact_email", "remote"]
        );
    }

    #[test]
    fn test_blank_keys_are_ordinary_fields() {
        let doc = json!({"properties": {"a": {}, "": {}, "b": {}}});
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.field_order(), vec!["a", "", "b"]);

        let doc = json!({
            "properties": {"name": {}, " ": {"type": "string"}},
            "required": ["name", " "]
        });
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.field_order(), vec!["name", " "]);
        assert!(schema.is_required(" "));
        assert_eq!(schema.field(" ").unwrap().title, " ");
    }

    #[test]
    fn test_field_order_not_alphabetical() {
        let doc = json!({"properties": {"zeta": {}, "alpha": {}, "mid": {}}});
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.field_order(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_types_resolved() {
        let schema = SchemaModel::parse(&org_schema()).unwrap();
        assert_eq!(schema.field("website").unwrap().field_type, FieldType::Url);
        assert_eq!(schema.field("founded").unwrap().field_type, FieldType::Integer);
        assert_eq!(schema.field("contact_email").unwrap().field_type, FieldType::Email);
        assert_eq!(schema.field("remote").unwrap().field_type, FieldType::Boolean);
        assert!(schema.coercions().is_empty());
    }

    #[test]
    fn test_missing_title_is_humanized() {
        let schema = SchemaModel::parse(&org_schema()).unwrap();
        assert_eq!(schema.field("contact_email").unwrap().title, "Contact Email");
        assert_eq!(schema.field("website").unwrap().title, "Website");
        assert_eq!(
            schema.field("founded").unwrap().description.as_deref(),
            Some("Year founded")
        );
    }

    #[test]
    fn test_missing_properties_is_empty_schema() {
        let schema = SchemaModel::parse(&json!({})).unwrap();
        assert!(schema.is_empty());
        assert!(schema.required().is_empty());

        let schema = SchemaModel::parse(&json!({"properties": null})).unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_dangling_required_rejected() {
        let doc = json!({
            "properties": {"name": {"type": "string"}},
            "required": ["name", "email"]
        });
        let err = SchemaModel::parse(&doc).unwrap_err();
        match err {
            ParseError::DanglingRequiredField { field } => assert_eq!(field, "email"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_required_without_properties_is_dangling() {
        let err = SchemaModel::parse(&json!({"required": ["name"]})).unwrap_err();
        assert!(matches!(err, ParseError::DanglingRequiredField { .. }));
    }

    #[test]
    fn test_unknown_type_coerced_to_string() {
        let doc = json!({
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "where": {"type": "geo-point"}
            }
        });
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.field("tags").unwrap().field_type, FieldType::String);
        assert_eq!(schema.field("where").unwrap().field_type, FieldType::String);
        let coerced: Vec<&str> = schema.coercions().iter().map(|c| c.declared.as_str()).collect();
        assert_eq!(coerced, vec!["array", "geo-point"]);
    }

    #[test]
    fn test_nullable_union_type() {
        let doc = json!({"properties": {"size": {"type": ["null", "integer"]}}});
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.field("size").unwrap().field_type, FieldType::Integer);
    }

    #[test]
    fn test_shorthand_and_odd_definitions() {
        let doc = json!({"properties": {"site": "url", "notes": 42, "bio": {}}});
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.field("site").unwrap().field_type, FieldType::Url);
        assert_eq!(schema.field("notes").unwrap().field_type, FieldType::String);
        assert_eq!(schema.field("bio").unwrap().title, "Bio");
    }

    #[test]
    fn test_enum_options_kept() {
        let doc = json!({"properties": {"size": {"type": "string", "enum": ["small", "large", 3]}}});
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.field("size").unwrap().options, vec!["small", "large", "3"]);
    }

    #[test]
    fn test_not_an_object() {
        let err = SchemaModel::parse(&json!("properties")).unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject { found: "a string" }));
    }

    #[test]
    fn test_malformed_properties() {
        let err = SchemaModel::parse(&json!({"properties": ["name"]})).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
        assert!(err.to_string().contains("/properties"));
    }

    #[test]
    fn test_required_deduplicated() {
        let doc = json!({"properties": {"name": {}}, "required": ["name", "name"]});
        let schema = SchemaModel::parse(&doc).unwrap();
        assert_eq!(schema.required(), &["name".to_string()]);
        assert!(schema.is_required("name"));
    }

    #[test]
    fn test_document_reparses_identically() {
        let schema = SchemaModel::parse(&org_schema()).unwrap();
        let reparsed = SchemaModel::parse(&schema.to_document()).unwrap();
        assert_eq!(schema.fields(), reparsed.fields());
        assert_eq!(schema.required(), reparsed.required());
    }

    #[test]
    fn test_serde_roundtrip_through_document() {
        let schema = SchemaModel::parse(&org_schema()).unwrap();
        let text = serde_json::to_string(&schema).unwrap();
        let back: SchemaModel = serde_json::from_str(&text).unwrap();
        assert_eq!(back.field_order(), schema.field_order());
    }

    #[test]
    fn test_parse_str_reports_json_syntax() {
        let err = SchemaModel::parse_str("{\"properties\": {").unwrap_err();
        assert!(matches!(err, SchemaTextError::Json(_)));

        let err = SchemaModel::parse_str("{\"required\": [\"x\"]}").unwrap_err();
        assert!(matches!(
            err,
            SchemaTextError::Parse(ParseError::DanglingRequiredField { .. })
        ));
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("focusAreas"), "Focus Areas");
        assert_eq!(humanize_key("contact_email"), "Contact Email");
        assert_eq!(humanize_key("engagement-types"), "Engagement Types");
        assert_eq!(humanize_key("name"), "Name");
        assert_eq!(humanize_key("URL"), "URL");
    }

    #[test]
    fn test_field_type_from_str() {
        for t in FieldType::all() {
            assert_eq!(t.as_str().parse::<FieldType>(), Ok(*t));
        }
        assert!("geo-point".parse::<FieldType>().is_err());
    }
}
