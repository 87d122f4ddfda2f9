//! Decode failures.
//!
//! These never leave the crate's public decode functions: every document
//! degrades to a documented default instead. The type exists so the fallback
//! paths can log what went wrong.

/// Why a document or entry was discarded.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DecodeError {
    /// The raw text is not JSON at all.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON has the wrong top-level shape.
    #[error("expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    /// A required field is missing or has the wrong type.
    #[error("missing or invalid field '{0}'")]
    Field(&'static str),
}

impl DecodeError {
    pub(crate) fn shape(expected: &'static str, found: &serde_json::Value) -> Self {
        DecodeError::Shape {
            expected,
            found: json_kind(found),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Parse raw document text as a JSON object.
///
/// `Ok(None)` means "nothing stored": absent or blank text.
pub(crate) fn parse_object(
    raw: Option<&str>,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>, DecodeError> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    match serde_json::from_str(raw)? {
        serde_json::Value::Object(map) => Ok(Some(map)),
        other => Err(DecodeError::shape("object", &other)),
    }
}
