//! Structured extraction schema and result types.
//!
//! A schema is an ordered list of named fields with a JSON kind, a required
//! flag, and a default. The extractor in `lectern-core` parses oracle output
//! against a schema and returns an [`ExtractionResult`].

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// JSON kind a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Boolean,
    TextList,
}

impl FieldKind {
    /// Default value for a field of this kind.
    pub fn default_value(self) -> Value {
        match self {
            FieldKind::Text => Value::String(String::new()),
            FieldKind::Integer => Value::from(0),
            FieldKind::Number => Value::from(0.0),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::TextList => Value::Array(Vec::new()),
        }
    }

    /// Whether `value` is of this kind. Null is never accepted here.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    /// Short description used when rendering format instructions.
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::TextList => "array of strings",
        }
    }
}

/// One field of an extraction schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Overrides the kind's default when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Value substituted when the field is missing or null.
    pub fn default_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.default_value())
    }
}

/// Ordered list of fields expected in the oracle's JSON output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    pub fields: Vec<FieldSpec>,
}

impl ExtractionSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Object holding the default of every required field.
    pub fn required_defaults(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| (f.name.clone(), f.default_value()))
            .collect()
    }

    /// Human-readable format instructions to embed in a prompt.
    pub fn format_instructions(&self) -> String {
        let mut out = String::from(
            "Respond with a single JSON object and nothing else. The object has these keys:\n",
        );
        for field in &self.fields {
            let presence = if field.required { "required" } else { "optional" };
            out.push_str(&format!(
                "- \"{}\": {} ({presence})\n",
                field.name,
                field.kind.describe()
            ));
        }
        out
    }
}

/// Outcome of a structured extraction.
///
/// `valid == false` means every attempt produced malformed output; `fields`
/// then holds the defaults of all required fields so callers can continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub valid: bool,
    pub fields: Map<String, Value>,
    pub attempts: u32,
    /// The last raw oracle output, kept for diagnostics.
    pub raw_output: String,
}

impl ExtractionResult {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(Value::as_i64)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    pub fn text_list(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deserialize the fields into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_defaults() {
        assert_eq!(FieldKind::Text.default_value(), json!(""));
        assert_eq!(FieldKind::Integer.default_value(), json!(0));
        assert_eq!(FieldKind::Boolean.default_value(), json!(false));
        assert_eq!(FieldKind::TextList.default_value(), json!([]));
    }

    #[test]
    fn test_kind_accepts() {
        assert!(FieldKind::Integer.accepts(&json!(5)));
        assert!(!FieldKind::Integer.accepts(&json!(5.5)));
        assert!(FieldKind::Number.accepts(&json!(5)));
        assert!(FieldKind::TextList.accepts(&json!(["a", "b"])));
        assert!(!FieldKind::TextList.accepts(&json!(["a", 1])));
        assert!(!FieldKind::Text.accepts(&Value::Null));
    }

    #[test]
    fn test_override_default() {
        let spec = FieldSpec::required("year", FieldKind::Integer).with_default(json!(1970));
        assert_eq!(spec.default_value(), json!(1970));
    }

    #[test]
    fn test_required_defaults_skip_optional() {
        let schema = ExtractionSchema::default()
            .field(FieldSpec::required("title", FieldKind::Text))
            .field(FieldSpec::optional("url", FieldKind::Text));
        let defaults = schema.required_defaults();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["title"], json!(""));
    }

    #[test]
    fn test_format_instructions_list_fields() {
        let schema = ExtractionSchema::default()
            .field(FieldSpec::required("keywords", FieldKind::TextList));
        let text = schema.format_instructions();
        assert!(text.contains("\"keywords\": array of strings (required)"));
    }

    #[test]
    fn test_result_accessors_and_deserialize() {
        #[derive(Deserialize)]
        struct Info {
            title: String,
            year: i64,
        }

        let mut fields = Map::new();
        fields.insert("title".into(), json!("A Paper"));
        fields.insert("year".into(), json!(2019));
        fields.insert("authors".into(), json!(["X", "Y"]));
        let result = ExtractionResult {
            valid: true,
            fields,
            attempts: 1,
            raw_output: String::new(),
        };
        assert_eq!(result.text("title"), Some("A Paper"));
        assert_eq!(result.integer("year"), Some(2019));
        assert_eq!(result.text_list("authors"), vec!["X", "Y"]);
        assert!(result.text_list("missing").is_empty());

        let info: Info = result.deserialize().unwrap();
        assert_eq!(info.title, "A Paper");
        assert_eq!(info.year, 2019);
    }
}
