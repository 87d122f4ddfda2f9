//! Term breakdown codec.
//!
//! The breakdowns document is an object keyed by card id:
//!
//! ```json
//! {"c1": {"term": "...", "parts": [{"part": "...", "meaning": "..."}],
//!         "literal": "...", "notes": "...", "updated_at": 1700000000,
//!         "updated_by": "user-1"}}
//! ```

use std::collections::BTreeMap;

use serde_json::{json, Map, Value as JsonValue};

use crate::error::{parse_object, DecodeError};
use crate::model::{BreakdownPart, TermBreakdown};

pub type Breakdowns = BTreeMap<String, TermBreakdown>;

fn now_epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

fn string_field(object: &Map<String, JsonValue>, name: &str) -> String {
    object
        .get(name)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn encode_part(part: &BreakdownPart) -> JsonValue {
    json!({
        "part": part.part,
        "meaning": part.meaning,
    })
}

fn decode_part(value: &JsonValue) -> Option<BreakdownPart> {
    let object = value.as_object()?;
    Some(BreakdownPart {
        part: string_field(object, "part"),
        meaning: string_field(object, "meaning"),
    })
}

/// Encode one breakdown. The card id is not part of the object; it is the
/// key the object is stored under.
pub fn encode_breakdown(breakdown: &TermBreakdown) -> JsonValue {
    let mut object = Map::new();
    object.insert("term".into(), json!(breakdown.term));
    object.insert(
        "parts".into(),
        JsonValue::Array(breakdown.parts.iter().map(encode_part).collect()),
    );
    object.insert("literal".into(), json!(breakdown.literal));
    object.insert("notes".into(), json!(breakdown.notes));
    object.insert("updated_at".into(), json!(breakdown.updated_at));
    if let Some(updated_by) = &breakdown.updated_by {
        object.insert("updated_by".into(), json!(updated_by));
    }
    JsonValue::Object(object)
}

/// Decode one breakdown object stored under `card_id`.
///
/// Missing strings become empty, missing `parts` becomes empty, a missing
/// timestamp becomes the current time and a missing updater stays absent.
/// Parts that are not objects are skipped.
pub fn decode_breakdown(card_id: &str, object: &Map<String, JsonValue>) -> TermBreakdown {
    let parts = object
        .get("parts")
        .and_then(JsonValue::as_array)
        .map(|parts| parts.iter().filter_map(decode_part).collect())
        .unwrap_or_default();

    let updated_at = match object.get("updated_at") {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_else(now_epoch_seconds),
        _ => now_epoch_seconds(),
    };

    TermBreakdown {
        card_id: card_id.to_string(),
        term: string_field(object, "term"),
        parts,
        literal: string_field(object, "literal"),
        notes: string_field(object, "notes"),
        updated_at,
        updated_by: object
            .get("updated_by")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
    }
}

pub fn encode_breakdowns(breakdowns: &Breakdowns) -> JsonValue {
    JsonValue::Object(
        breakdowns
            .iter()
            .map(|(id, breakdown)| (id.clone(), encode_breakdown(breakdown)))
            .collect(),
    )
}

/// Decode the breakdowns document. Entries that are not objects are dropped;
/// an unreadable document decodes as empty.
pub fn decode_breakdowns(raw: Option<&str>) -> Breakdowns {
    let map = match parse_object(raw) {
        Ok(Some(map)) => map,
        Ok(None) => return Breakdowns::new(),
        Err(err) => {
            tracing::warn!(error = %err, "discarding stored breakdowns");
            return Breakdowns::new();
        }
    };

    map.into_iter()
        .filter_map(|(id, value)| match value {
            JsonValue::Object(object) => {
                let breakdown = decode_breakdown(&id, &object);
                Some((id, breakdown))
            }
            other => {
                let err = DecodeError::shape("object", &other);
                tracing::warn!(card_id = %id, error = %err, "skipping stored breakdown");
                None
            }
        })
        .collect()
}
