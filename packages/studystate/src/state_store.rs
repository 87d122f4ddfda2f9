//! Typed study state operations over a document store.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};

use studystate_codec::{
    decode_breakdowns, decode_cards, decode_settings, encode_breakdowns, encode_cards,
    encode_progress, encode_settings, Breakdowns, CardStatus, FlashCard, ProgressState,
    StoredProgress, StudyMode, StudySettings, TermBreakdown,
};
use studystate_doc_store::{
    DocKey, DocumentStore, JsonFilePersistence, PersistentStore, Snapshot, Transform,
};

use crate::collaborators::CardCatalog;
use crate::config::StoreConfig;
use crate::error::{Result, StudyStateError};
use crate::keys::{
    settings_key, ALL_KEYS, BREAKDOWNS, CUSTOM_CARDS, LEGACY_DELETED, LEGACY_KEYS, LEGACY_LEARNED,
    PROGRESS, PROGRESS_KEYS,
};

fn resolve_snapshot(snapshot: &Snapshot) -> ProgressState {
    StoredProgress::classify(
        snapshot.get(&PROGRESS),
        snapshot.get(&LEGACY_LEARNED),
        snapshot.get(&LEGACY_DELETED),
    )
    .resolve()
}

/// Typed access to all persisted study state.
///
/// A cheap, cloneable handle over a shared `DocumentStore`. Every operation
/// may suspend on storage I/O; storage failures are returned, while
/// unreadable documents read as their defaults.
///
/// # Example
///
/// ```rust
/// use studystate::{CardStatus, StudyStateStore};
///
/// # futures::executor::block_on(async {
/// let state = StudyStateStore::in_memory();
/// state.set_status("card-1", CardStatus::Learned).await.unwrap();
/// assert_eq!(state.status("card-1").await.unwrap(), CardStatus::Learned);
///
/// state.set_status("card-1", CardStatus::Active).await.unwrap();
/// assert!(state.progress().await.unwrap().is_empty());
/// # });
/// ```
#[derive(Clone)]
pub struct StudyStateStore {
    docs: Arc<dyn DocumentStore>,
}

impl StudyStateStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    /// A store that keeps everything in process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(PersistentStore::in_memory()))
    }

    /// Open the store described by `config`, creating its directory if needed.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        if config.in_memory {
            return Ok(Self::in_memory());
        }

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|source| StudyStateError::DataDir {
                path: config.data_dir.clone(),
                source,
            })?;

        let persistence = JsonFilePersistence::new(config.data_dir.clone(), &config.file_name)?;
        let store = PersistentStore::open(persistence).await?;
        tracing::debug!(file = %config.state_file().display(), "opened study state");
        Ok(Self::new(Arc::new(store)))
    }

    /// The underlying document store.
    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.docs
    }

    async fn transact(&self, key: &DocKey, transform: Transform) -> Result<()> {
        self.docs.transact(key, transform).await?;
        Ok(())
    }

    // Progress

    /// The unified progress state, resolved from whichever format is stored.
    pub async fn progress(&self) -> Result<ProgressState> {
        let snapshot = self.docs.snapshot(&PROGRESS_KEYS[..]).await?;
        Ok(resolve_snapshot(&snapshot))
    }

    /// Progress re-resolved on every change to the current or legacy keys.
    pub async fn observe_progress(&self) -> Result<BoxStream<'static, ProgressState>> {
        let observation = self.docs.observe_many(&PROGRESS_KEYS[..]).await?;
        Ok(observation
            .map(|snapshot| resolve_snapshot(&snapshot))
            .boxed())
    }

    pub async fn status(&self, id: &str) -> Result<CardStatus> {
        Ok(self.progress().await?.status(id))
    }

    /// Record `status` for `id`. `Active` removes the entry.
    ///
    /// While only legacy data exists, the first write starts from the legacy
    /// view so historical marks carry over into the status map.
    pub async fn set_status(&self, id: &str, status: CardStatus) -> Result<()> {
        let id = id.to_string();

        // The legacy documents are read under the progress key lock, so a
        // concurrent `clear_all_progress` cannot leave stale marks behind.
        self.docs
            .transact_with(
                &PROGRESS,
                &LEGACY_KEYS[..],
                Box::new(move |raw: Option<&str>, legacy: &Snapshot| {
                    let mut state = StoredProgress::classify(
                        raw,
                        legacy.get(&LEGACY_LEARNED),
                        legacy.get(&LEGACY_DELETED),
                    )
                    .resolve();
                    state.set(id, status);
                    encode_progress(&state).to_string()
                }),
            )
            .await?;
        Ok(())
    }

    /// Remove the current and both legacy progress documents together.
    pub async fn clear_all_progress(&self) -> Result<()> {
        self.docs.remove_keys(&PROGRESS_KEYS[..]).await?;
        Ok(())
    }

    // Breakdowns

    pub async fn breakdowns(&self) -> Result<Breakdowns> {
        let raw = self.docs.get(&BREAKDOWNS).await?;
        Ok(decode_breakdowns(raw.as_deref()))
    }

    pub async fn observe_breakdowns(&self) -> Result<BoxStream<'static, Breakdowns>> {
        let values = self.docs.observe(&BREAKDOWNS).await?;
        Ok(values.map(|raw| decode_breakdowns(raw.as_deref())).boxed())
    }

    pub async fn breakdown(&self, card_id: &str) -> Result<Option<TermBreakdown>> {
        Ok(self.breakdowns().await?.remove(card_id))
    }

    /// Store `breakdown` under its card id, replacing any previous one.
    ///
    /// A breakdown without content removes the entry instead.
    pub async fn save_breakdown(&self, breakdown: TermBreakdown) -> Result<()> {
        self.transact(
            &BREAKDOWNS,
            Box::new(move |raw: Option<&str>| {
                let mut breakdowns = decode_breakdowns(raw);
                if breakdown.has_content() {
                    breakdowns.insert(breakdown.card_id.clone(), breakdown);
                } else {
                    breakdowns.remove(&breakdown.card_id);
                }
                encode_breakdowns(&breakdowns).to_string()
            }),
        )
        .await
    }

    pub async fn delete_breakdown(&self, card_id: &str) -> Result<()> {
        let card_id = card_id.to_string();
        self.transact(
            &BREAKDOWNS,
            Box::new(move |raw: Option<&str>| {
                let mut breakdowns = decode_breakdowns(raw);
                breakdowns.remove(&card_id);
                encode_breakdowns(&breakdowns).to_string()
            }),
        )
        .await
    }

    // Settings

    pub async fn settings_for(&self, mode: StudyMode) -> Result<StudySettings> {
        let raw = self.docs.get(settings_key(mode)).await?;
        Ok(decode_settings(raw.as_deref()))
    }

    pub async fn observe_settings(
        &self,
        mode: StudyMode,
    ) -> Result<BoxStream<'static, StudySettings>> {
        let values = self.docs.observe(settings_key(mode)).await?;
        Ok(values.map(|raw| decode_settings(raw.as_deref())).boxed())
    }

    pub async fn save_settings_for(&self, mode: StudyMode, settings: &StudySettings) -> Result<()> {
        let encoded = encode_settings(settings).to_string();
        self.transact(settings_key(mode), Box::new(move |_: Option<&str>| encoded))
            .await
    }

    // Custom cards

    pub async fn custom_cards(&self) -> Result<Vec<FlashCard>> {
        let raw = self.docs.get(&CUSTOM_CARDS).await?;
        Ok(decode_cards(raw.as_deref()))
    }

    pub async fn observe_custom_cards(&self) -> Result<BoxStream<'static, Vec<FlashCard>>> {
        let values = self.docs.observe(&CUSTOM_CARDS).await?;
        Ok(values.map(|raw| decode_cards(raw.as_deref())).boxed())
    }

    /// Overwrite the whole custom card collection.
    pub async fn replace_custom_cards(&self, cards: &[FlashCard]) -> Result<()> {
        let encoded = encode_cards(cards).to_string();
        self.transact(&CUSTOM_CARDS, Box::new(move |_: Option<&str>| encoded))
            .await
    }

    /// Catalog cards followed by custom cards whose ids the catalog lacks.
    pub async fn all_cards(&self, catalog: &dyn CardCatalog) -> Result<Vec<FlashCard>> {
        let mut cards = catalog.cards();
        let custom = self.custom_cards().await?;
        for card in custom {
            if cards.iter().any(|existing| existing.id == card.id) {
                tracing::debug!(card_id = %card.id, "custom card shadowed by catalog card");
                continue;
            }
            cards.push(card);
        }
        Ok(cards)
    }

    /// Remove every study state document in one commit.
    pub async fn reset_all(&self) -> Result<()> {
        self.docs.remove_keys(&ALL_KEYS[..]).await?;
        Ok(())
    }
}
