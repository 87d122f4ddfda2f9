//! Study state model and codecs.
//!
//! This layer owns all knowledge of document formats:
//! - `model`: card statuses, progress, breakdowns, cards, study modes
//! - `settings`: the per-mode settings record with total decoding
//! - `breakdown`, `cards`: map and array documents with per-entry skipping
//! - `progress`: current status map plus the legacy flag-map migration
//!
//! Every `decode_*` function is total. Malformed input degrades to a
//! documented default and is logged with `tracing`; nothing here returns an
//! error to the caller.
//!
//! # Example
//!
//! ```rust
//! use studystate_codec::{resolve_progress, CardStatus};
//!
//! let state = resolve_progress(
//!     None,
//!     Some(r#"{"A": true, "B": true}"#),
//!     Some(r#"{"B": true}"#),
//! );
//! assert_eq!(state.status("A"), CardStatus::Learned);
//! assert_eq!(state.status("B"), CardStatus::Deleted);
//! ```

mod breakdown;
mod cards;
mod error;
mod model;
mod progress;
mod settings;

pub use breakdown::{
    decode_breakdown, decode_breakdowns, encode_breakdown, encode_breakdowns, Breakdowns,
};
pub use cards::{decode_cards, encode_cards};
pub use model::{
    BreakdownPart, CardStatus, FlashCard, ProgressCounts, ProgressState, StatusPartition,
    StudyMode, TermBreakdown,
};
pub use progress::{decode_progress, encode_progress, resolve_progress, StoredProgress};
pub use settings::{
    clamp_speech_rate, decode_settings, encode_settings, settings_from_json, LearnedViewMode,
    SortMode, StudySettings, DEFAULT_SPEECH_RATE, MAX_SPEECH_RATE, MIN_SPEECH_RATE,
};
