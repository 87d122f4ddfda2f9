//! Document keys of the persisted state layout.

use lazy_static::lazy_static;
use studystate_codec::StudyMode;
use studystate_doc_store::{doc_key, DocKey};

lazy_static! {
    /// Current status map, `{id: "unsure" | "learned" | "deleted"}`.
    pub static ref PROGRESS: DocKey = doc_key!("progress_json");
    /// Legacy learned flags, `{id: bool}`. Read-only.
    pub static ref LEGACY_LEARNED: DocKey = doc_key!("learned_json");
    /// Legacy deleted flags, `{id: bool}`. Read-only.
    pub static ref LEGACY_DELETED: DocKey = doc_key!("deleted_json");
    pub static ref CUSTOM_CARDS: DocKey = doc_key!("custom_cards_json");
    pub static ref BREAKDOWNS: DocKey = doc_key!("breakdowns_json");
    pub static ref SETTINGS_SINGLE: DocKey = doc_key!("settings_single_json");
    pub static ref SETTINGS_ALL: DocKey = doc_key!("settings_all_json");

    /// Every key that feeds the resolved progress state.
    pub static ref PROGRESS_KEYS: [DocKey; 3] = [
        PROGRESS.clone(),
        LEGACY_LEARNED.clone(),
        LEGACY_DELETED.clone(),
    ];

    /// The read-only legacy flag documents.
    pub static ref LEGACY_KEYS: [DocKey; 2] = [LEGACY_LEARNED.clone(), LEGACY_DELETED.clone()];

    pub static ref ALL_KEYS: [DocKey; 7] = [
        PROGRESS.clone(),
        LEGACY_LEARNED.clone(),
        LEGACY_DELETED.clone(),
        CUSTOM_CARDS.clone(),
        BREAKDOWNS.clone(),
        SETTINGS_SINGLE.clone(),
        SETTINGS_ALL.clone(),
    ];
}

/// The settings document for a study mode.
pub fn settings_key(mode: StudyMode) -> &'static DocKey {
    match mode {
        StudyMode::SingleGroup => &SETTINGS_SINGLE,
        StudyMode::AllCards => &SETTINGS_ALL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn keys_are_distinct() {
        let unique: BTreeSet<&DocKey> = ALL_KEYS.iter().collect();
        assert_eq!(unique.len(), ALL_KEYS.len());
    }

    #[test]
    fn modes_have_their_own_settings_document() {
        assert_eq!(settings_key(StudyMode::SingleGroup).as_str(), "settings_single_json");
        assert_eq!(settings_key(StudyMode::AllCards).as_str(), "settings_all_json");
    }
}
