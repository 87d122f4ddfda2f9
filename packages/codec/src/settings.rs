//! Study settings record and its codec.
//!
//! Decoding is total: a missing field takes its default, an unknown enum name
//! takes that enum's default, and anything that fails to decode as a whole
//! yields `StudySettings::default()`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{parse_object, DecodeError};

pub const MIN_SPEECH_RATE: f32 = 0.5;
pub const MAX_SPEECH_RATE: f32 = 2.0;
pub const DEFAULT_SPEECH_RATE: f32 = 1.0;

/// Clamp a speech rate into the supported range. NaN becomes the default
/// rate; infinities clamp to the nearest bound.
pub fn clamp_speech_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        DEFAULT_SPEECH_RATE
    } else {
        rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE)
    }
}

// Stored rates may exceed the f32 range; clamp before narrowing.
fn deserialize_speech_rate<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let rate = f64::deserialize(deserializer)?;
    if rate.is_nan() {
        return Ok(DEFAULT_SPEECH_RATE);
    }
    Ok(rate.clamp(f64::from(MIN_SPEECH_RATE), f64::from(MAX_SPEECH_RATE)) as f32)
}

/// Card ordering within a study session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortMode {
    #[default]
    Random,
    GroupRandom,
    GroupSubgroup,
}

impl SortMode {
    pub fn name(self) -> &'static str {
        match self {
            SortMode::Random => "RANDOM",
            SortMode::GroupRandom => "GROUP_RANDOM",
            SortMode::GroupSubgroup => "GROUP_SUBGROUP",
        }
    }

    /// Total lookup by name; unknown names give `Random`.
    pub fn from_name(name: &str) -> SortMode {
        match name {
            "RANDOM" => SortMode::Random,
            "GROUP_RANDOM" => SortMode::GroupRandom,
            "GROUP_SUBGROUP" => SortMode::GroupSubgroup,
            _ => SortMode::default(),
        }
    }
}

/// How the learned-cards screen presents its cards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearnedViewMode {
    #[default]
    List,
    Study,
}

impl LearnedViewMode {
    pub fn name(self) -> &'static str {
        match self {
            LearnedViewMode::List => "LIST",
            LearnedViewMode::Study => "STUDY",
        }
    }

    /// Total lookup by name; unknown names give `List`.
    pub fn from_name(name: &str) -> LearnedViewMode {
        match name {
            "LIST" => LearnedViewMode::List,
            "STUDY" => LearnedViewMode::Study,
            _ => LearnedViewMode::default(),
        }
    }
}

impl<'de> Deserialize<'de> for SortMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(value.as_str().map(SortMode::from_name).unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for LearnedViewMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .map(LearnedViewMode::from_name)
            .unwrap_or_default())
    }
}

/// Per-mode study configuration.
///
/// Two independent records exist, one for single-group study and one for
/// all-cards study.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudySettings {
    /// `None` means no group filter.
    pub selected_group: Option<String>,
    /// `None` means no subgroup filter.
    pub selected_subgroup: Option<String>,
    pub sort_mode: SortMode,
    pub show_pronunciation: bool,
    pub show_meaning_first: bool,
    pub show_group_label: bool,
    pub show_subgroup_label: bool,
    pub auto_speak: bool,
    pub speak_meaning: bool,
    pub include_unsure: bool,
    pub include_learned: bool,
    pub shuffle_on_restart: bool,
    pub show_progress: bool,
    pub show_breakdown: bool,
    pub auto_reveal: bool,
    pub keep_screen_on: bool,
    pub learned_view_mode: LearnedViewMode,
    /// `None` means the speech engine's default voice.
    pub voice_name: Option<String>,
    /// Always within `[MIN_SPEECH_RATE, MAX_SPEECH_RATE]` after decoding.
    #[serde(deserialize_with = "deserialize_speech_rate")]
    pub speech_rate: f32,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            selected_group: None,
            selected_subgroup: None,
            sort_mode: SortMode::Random,
            show_pronunciation: true,
            show_meaning_first: false,
            show_group_label: true,
            show_subgroup_label: true,
            auto_speak: false,
            speak_meaning: false,
            include_unsure: true,
            include_learned: false,
            shuffle_on_restart: true,
            show_progress: true,
            show_breakdown: true,
            auto_reveal: false,
            keep_screen_on: false,
            learned_view_mode: LearnedViewMode::List,
            voice_name: None,
            speech_rate: DEFAULT_SPEECH_RATE,
        }
    }
}

impl StudySettings {
    /// Copy with the speech rate set (and clamped).
    pub fn with_speech_rate(mut self, rate: f32) -> Self {
        self.speech_rate = clamp_speech_rate(rate);
        self
    }

    fn normalized(mut self) -> Self {
        self.speech_rate = clamp_speech_rate(self.speech_rate);
        self
    }
}

/// Encode settings as a flat JSON object. The speech rate is clamped first.
pub fn encode_settings(settings: &StudySettings) -> JsonValue {
    let normalized = settings.clone().normalized();
    // Plain strings, bools and floats only; serialization cannot fail.
    serde_json::to_value(normalized).unwrap_or(JsonValue::Null)
}

/// Decode a settings object. Never fails: see the module docs.
pub fn settings_from_json(value: JsonValue) -> StudySettings {
    match value {
        JsonValue::Object(_) => match serde_json::from_value::<StudySettings>(value) {
            Ok(settings) => settings.normalized(),
            Err(err) => {
                tracing::warn!(error = %err, "discarding stored settings");
                StudySettings::default()
            }
        },
        JsonValue::Null => StudySettings::default(),
        other => {
            let err = DecodeError::shape("object", &other);
            tracing::warn!(error = %err, "discarding stored settings");
            StudySettings::default()
        }
    }
}

/// Decode raw settings text. Absent, blank or malformed text gives the
/// all-defaults record.
pub fn decode_settings(raw: Option<&str>) -> StudySettings {
    match parse_object(raw) {
        Ok(Some(map)) => settings_from_json(JsonValue::Object(map)),
        Ok(None) => StudySettings::default(),
        Err(err) => {
            tracing::warn!(error = %err, "discarding stored settings");
            StudySettings::default()
        }
    }
}
