//! Progress documents and the legacy-format migration.
//!
//! Two shapes exist on disk:
//!
//! - current: one status map, `{"id": "learned" | "unsure" | "deleted"}`;
//! - legacy: two flag maps, `learned` and `deleted`, each `{"id": bool}`.
//!
//! Reads classify what is stored into a `StoredProgress` and resolve it into
//! one `ProgressState`. Resolution never writes anything back.

use serde_json::{Map, Value as JsonValue};

use crate::error::parse_object;
use crate::model::{CardStatus, ProgressState};

/// Encode the current-format status map. Active cards are never written.
pub fn encode_progress(state: &ProgressState) -> JsonValue {
    JsonValue::Object(
        state
            .iter()
            .filter(|(_, status)| *status != CardStatus::Active)
            .map(|(id, status)| (id.to_string(), JsonValue::String(status.name().to_string())))
            .collect(),
    )
}

fn statuses_from_object(map: Map<String, JsonValue>) -> ProgressState {
    map.into_iter()
        .map(|(id, value)| {
            let status = value
                .as_str()
                .map(CardStatus::from_name)
                .unwrap_or_default();
            (id, status)
        })
        .collect()
}

/// Decode a current-format status map. Unknown status names read as active
/// and are dropped; an unreadable document decodes as empty.
pub fn decode_progress(raw: Option<&str>) -> ProgressState {
    match parse_object(raw) {
        Ok(Some(map)) => statuses_from_object(map),
        Ok(None) => ProgressState::new(),
        Err(err) => {
            tracing::warn!(error = %err, "discarding stored progress");
            ProgressState::new()
        }
    }
}

/// Ids whose flag is `true` in a legacy flag map.
fn flagged_ids(raw: Option<&str>, document: &'static str) -> Vec<String> {
    match parse_object(raw) {
        Ok(Some(map)) => map
            .into_iter()
            .filter(|(_, flag)| flag.as_bool() == Some(true))
            .map(|(id, _)| id)
            .collect(),
        Ok(None) => Vec::new(),
        Err(err) => {
            tracing::warn!(document, error = %err, "ignoring legacy progress flags");
            Vec::new()
        }
    }
}

/// Which progress shape is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoredProgress<'a> {
    /// Nothing stored in either shape.
    Empty,
    /// The current status map, present and non-blank.
    Current(&'a str),
    /// Only the legacy flag maps (either may be missing).
    Legacy {
        learned: Option<&'a str>,
        deleted: Option<&'a str>,
    },
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

impl<'a> StoredProgress<'a> {
    /// Pick the shape to read. A present, non-blank current map always wins;
    /// legacy maps are only consulted without it.
    pub fn classify(
        current: Option<&'a str>,
        learned: Option<&'a str>,
        deleted: Option<&'a str>,
    ) -> Self {
        if let Some(current) = present(current) {
            return StoredProgress::Current(current);
        }
        match (present(learned), present(deleted)) {
            (None, None) => StoredProgress::Empty,
            (learned, deleted) => StoredProgress::Legacy { learned, deleted },
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, StoredProgress::Legacy { .. })
    }

    /// Produce the unified progress state.
    ///
    /// For legacy data, ids flagged in both maps resolve to `Deleted`: the
    /// deleted flags are applied after the learned flags.
    pub fn resolve(&self) -> ProgressState {
        match *self {
            StoredProgress::Empty => ProgressState::new(),
            StoredProgress::Current(raw) => decode_progress(Some(raw)),
            StoredProgress::Legacy { learned, deleted } => {
                let mut state = ProgressState::new();
                for id in flagged_ids(learned, "learned_json") {
                    state.set(id, CardStatus::Learned);
                }
                for id in flagged_ids(deleted, "deleted_json") {
                    state.set(id, CardStatus::Deleted);
                }
                state
            }
        }
    }
}

/// Classify and resolve in one step.
pub fn resolve_progress(
    current: Option<&str>,
    learned: Option<&str>,
    deleted: Option<&str>,
) -> ProgressState {
    StoredProgress::classify(current, learned, deleted).resolve()
}
