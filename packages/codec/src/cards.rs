//! Custom card collection codec.

use serde_json::{json, Map, Value as JsonValue};

use crate::error::DecodeError;
use crate::model::FlashCard;

fn required(object: &Map<String, JsonValue>, name: &'static str) -> Result<String, DecodeError> {
    object
        .get(name)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or(DecodeError::Field(name))
}

/// Blank and non-string values read as absent.
fn optional(object: &Map<String, JsonValue>, name: &str) -> Option<String> {
    object
        .get(name)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn decode_card(value: &JsonValue) -> Result<FlashCard, DecodeError> {
    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::shape("object", value))?;

    let id = required(object, "id")?;
    if id.trim().is_empty() {
        return Err(DecodeError::Field("id"));
    }

    Ok(FlashCard {
        id,
        group: required(object, "group")?,
        subgroup: optional(object, "subgroup"),
        term: required(object, "term")?,
        pronunciation: optional(object, "pron"),
        meaning: required(object, "meaning")?,
    })
}

/// Encode cards as an array, preserving order.
pub fn encode_cards(cards: &[FlashCard]) -> JsonValue {
    JsonValue::Array(
        cards
            .iter()
            .map(|card| {
                json!({
                    "id": card.id,
                    "group": card.group,
                    "subgroup": card.subgroup,
                    "term": card.term,
                    "pron": card.pronunciation,
                    "meaning": card.meaning,
                })
            })
            .collect(),
    )
}

/// Decode the custom cards document in stored order.
///
/// Entries without a non-blank `id` or without string `group`, `term` and
/// `meaning` are skipped. An unreadable document decodes as empty.
pub fn decode_cards(raw: Option<&str>) -> Vec<FlashCard> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };

    let entries = match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Array(entries)) => entries,
        Ok(other) => {
            let err = DecodeError::shape("array", &other);
            tracing::warn!(error = %err, "discarding stored custom cards");
            return Vec::new();
        }
        Err(err) => {
            let err = DecodeError::from(err);
            tracing::warn!(error = %err, "discarding stored custom cards");
            return Vec::new();
        }
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match decode_card(entry) {
            Ok(card) => Some(card),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping stored custom card");
                None
            }
        })
        .collect()
}
