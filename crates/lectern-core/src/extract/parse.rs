//! Parsing oracle output against an extraction schema.

use serde_json::{Map, Value};

use lectern_types::extraction::ExtractionSchema;

/// Why an output was rejected. Never leaves the extractor; it only decides
/// whether another attempt is made.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseFailure {
    #[error("output is not valid JSON: {0}")]
    NotJson(String),

    #[error("output is JSON but not an object")]
    NotObject,

    #[error("field '{field}' should be {expected}")]
    WrongKind { field: String, expected: &'static str },
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    match body.split_once('\n') {
        Some((info, inner)) if !info.contains('{') && !info.contains('[') => inner.trim(),
        _ => body.trim(),
    }
}

fn parse_object(text: &str) -> Result<Map<String, Value>, ParseFailure> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ParseFailure::NotObject),
        Err(e) => Err(ParseFailure::NotJson(e.to_string())),
    }
}

/// Parse `raw` into the schema's fields.
///
/// The text is trimmed and unfenced first. If it still does not parse, the
/// span from the first `{` to the last `}` is tried, which recovers objects
/// wrapped in a sentence of prose. Every present, non-null schema field must
/// have the right kind. Missing or null required fields get their default;
/// missing or null optional fields are left out. Keys outside the schema
/// are dropped.
pub fn parse_fields(
    schema: &ExtractionSchema,
    raw: &str,
) -> Result<Map<String, Value>, ParseFailure> {
    let text = strip_code_fence(raw);
    let mut object = match parse_object(text) {
        Ok(map) => map,
        Err(first_err) => match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                parse_object(&text[start..=end]).map_err(|_| first_err)?
            }
            _ => return Err(first_err),
        },
    };

    let mut fields = Map::new();
    for spec in &schema.fields {
        match object.remove(&spec.name) {
            Some(Value::Null) | None => {
                if spec.required {
                    fields.insert(spec.name.clone(), spec.default_value());
                }
            }
            Some(value) if spec.kind.accepts(&value) => {
                fields.insert(spec.name.clone(), value);
            }
            Some(_) => {
                return Err(ParseFailure::WrongKind {
                    field: spec.name.clone(),
                    expected: spec.kind.describe(),
                });
            }
        }
    }
    Ok(fields)
}
