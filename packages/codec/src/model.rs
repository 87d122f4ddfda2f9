//! Study state entities.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Study progress of one card.
///
/// `Active` is the implicit default: it is never written to storage, and a
/// card id missing from the progress document is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardStatus {
    #[default]
    Active,
    Unsure,
    Learned,
    Deleted,
}

impl CardStatus {
    pub const ALL: [CardStatus; 4] = [
        CardStatus::Active,
        CardStatus::Unsure,
        CardStatus::Learned,
        CardStatus::Deleted,
    ];

    /// Lower-case wire name.
    pub fn name(self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Unsure => "unsure",
            CardStatus::Learned => "learned",
            CardStatus::Deleted => "deleted",
        }
    }

    /// Total lookup: case-insensitive, anything unrecognized is `Active`.
    pub fn from_name(name: &str) -> CardStatus {
        match name.trim().to_lowercase().as_str() {
            "learned" => CardStatus::Learned,
            "unsure" => CardStatus::Unsure,
            "deleted" => CardStatus::Deleted,
            _ => CardStatus::Active,
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit statuses of every non-active card.
///
/// Invariant: no entry maps to `CardStatus::Active`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressState {
    statuses: BTreeMap<String, CardStatus>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, id: &str) -> CardStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    /// Record `status` for `id`. Setting `Active` removes the entry.
    pub fn set(&mut self, id: impl Into<String>, status: CardStatus) {
        let id = id.into();
        if status == CardStatus::Active {
            self.statuses.remove(&id);
        } else {
            self.statuses.insert(id, status);
        }
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Explicit (non-active) entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CardStatus)> {
        self.statuses.iter().map(|(id, status)| (id.as_str(), *status))
    }

    pub fn learned_ids(&self) -> BTreeSet<String> {
        self.ids_with(CardStatus::Learned)
    }

    pub fn unsure_ids(&self) -> BTreeSet<String> {
        self.ids_with(CardStatus::Unsure)
    }

    pub fn deleted_ids(&self) -> BTreeSet<String> {
        self.ids_with(CardStatus::Deleted)
    }

    fn ids_with(&self, wanted: CardStatus) -> BTreeSet<String> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == wanted)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Split `universe` plus every explicitly tracked id into four disjoint
    /// sets, one per status.
    pub fn partition<'a, I>(&self, universe: I) -> StatusPartition
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut partition = StatusPartition::default();
        let ids = universe
            .into_iter()
            .map(str::to_string)
            .chain(self.statuses.keys().cloned());
        for id in ids {
            let status = self.status(&id);
            partition.set_mut(status).insert(id);
        }
        partition
    }

    pub fn counts<'a, I>(&self, universe: I) -> ProgressCounts
    where
        I: IntoIterator<Item = &'a str>,
    {
        let partition = self.partition(universe);
        ProgressCounts {
            active: partition.active.len(),
            unsure: partition.unsure.len(),
            learned: partition.learned.len(),
            deleted: partition.deleted.len(),
        }
    }
}

impl FromIterator<(String, CardStatus)> for ProgressState {
    fn from_iter<I: IntoIterator<Item = (String, CardStatus)>>(iter: I) -> Self {
        let mut state = ProgressState::new();
        for (id, status) in iter {
            state.set(id, status);
        }
        state
    }
}

/// Card ids grouped by status. Every id appears in exactly one set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusPartition {
    pub active: BTreeSet<String>,
    pub unsure: BTreeSet<String>,
    pub learned: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl StatusPartition {
    pub fn ids(&self, status: CardStatus) -> &BTreeSet<String> {
        match status {
            CardStatus::Active => &self.active,
            CardStatus::Unsure => &self.unsure,
            CardStatus::Learned => &self.learned,
            CardStatus::Deleted => &self.deleted,
        }
    }

    fn set_mut(&mut self, status: CardStatus) -> &mut BTreeSet<String> {
        match status {
            CardStatus::Active => &mut self.active,
            CardStatus::Unsure => &mut self.unsure,
            CardStatus::Learned => &mut self.learned,
            CardStatus::Deleted => &mut self.deleted,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub active: usize,
    pub unsure: usize,
    pub learned: usize,
    pub deleted: usize,
}

impl ProgressCounts {
    pub fn total(&self) -> usize {
        self.active + self.unsure + self.learned + self.deleted
    }
}

/// One component of a term with its meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BreakdownPart {
    pub part: String,
    pub meaning: String,
}

impl BreakdownPart {
    pub fn new(part: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            meaning: meaning.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.part.trim().is_empty() && self.meaning.trim().is_empty()
    }
}

/// A user-authored explanation of a card's term.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermBreakdown {
    pub card_id: String,
    pub term: String,
    /// Ordered; order is meaningful.
    pub parts: Vec<BreakdownPart>,
    pub literal: String,
    pub notes: String,
    /// Seconds since the Unix epoch.
    pub updated_at: i64,
    pub updated_by: Option<String>,
}

impl TermBreakdown {
    /// True when any part carries text or the literal translation is set.
    ///
    /// Notes alone do not count as content.
    pub fn has_content(&self) -> bool {
        self.parts.iter().any(|part| !part.is_blank()) || !self.literal.trim().is_empty()
    }
}

/// An immutable flashcard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashCard {
    pub id: String,
    pub group: String,
    pub subgroup: Option<String>,
    pub term: String,
    pub pronunciation: Option<String>,
    pub meaning: String,
}

/// Which study screen a settings record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StudyMode {
    SingleGroup,
    AllCards,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_round_trip() {
        for status in CardStatus::ALL {
            assert_eq!(CardStatus::from_name(status.name()), status);
        }
        assert_eq!(CardStatus::from_name("LEARNED"), CardStatus::Learned);
        assert_eq!(CardStatus::from_name(" Unsure "), CardStatus::Unsure);
        assert_eq!(CardStatus::from_name("garbage"), CardStatus::Active);
        assert_eq!(CardStatus::from_name(""), CardStatus::Active);
    }

    #[test]
    fn setting_active_removes_entry() {
        let mut state = ProgressState::new();
        state.set("X", CardStatus::Learned);
        assert_eq!(state.status("X"), CardStatus::Learned);
        assert_eq!(state.len(), 1);

        state.set("X", CardStatus::Active);
        assert!(state.is_empty());
        assert_eq!(state.status("X"), CardStatus::Active);
    }

    #[test]
    fn from_iter_drops_active_entries() {
        let state: ProgressState = vec![
            ("A".to_string(), CardStatus::Active),
            ("B".to_string(), CardStatus::Deleted),
        ]
        .into_iter()
        .collect();
        assert_eq!(state.len(), 1);
        assert_eq!(state.deleted_ids().into_iter().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn partition_is_disjoint_and_covers_everything() {
        let mut state = ProgressState::new();
        state.set("learned", CardStatus::Learned);
        state.set("unsure", CardStatus::Unsure);
        state.set("deleted", CardStatus::Deleted);
        state.set("orphan", CardStatus::Learned);

        let universe = ["learned", "unsure", "deleted", "fresh", "fresh_2"];
        let partition = state.partition(universe);

        let mut all_ids: Vec<&str> = universe.to_vec();
        all_ids.push("orphan");
        for id in all_ids {
            let holders = CardStatus::ALL
                .iter()
                .filter(|status| partition.ids(**status).contains(id))
                .count();
            assert_eq!(holders, 1, "{} must be in exactly one set", id);
            assert!(partition.ids(state.status(id)).contains(id));
        }

        assert_eq!(partition.active.len(), 2);
        assert_eq!(partition.learned.len(), 2);

        let counts = state.counts(universe);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.unsure, 1);
    }

    #[test]
    fn has_content_rules() {
        let mut breakdown = TermBreakdown {
            card_id: "c1".to_string(),
            term: "term".to_string(),
            notes: "notes do not count".to_string(),
            ..Default::default()
        };
        assert!(!breakdown.has_content());

        breakdown.parts.push(BreakdownPart::new("  ", ""));
        assert!(!breakdown.has_content());

        breakdown.parts.push(BreakdownPart::new("", "a meaning"));
        assert!(breakdown.has_content());

        breakdown.parts.clear();
        breakdown.literal = "literal".to_string();
        assert!(breakdown.has_content());

        breakdown.literal = "   ".to_string();
        assert!(!breakdown.has_content());
    }
}
