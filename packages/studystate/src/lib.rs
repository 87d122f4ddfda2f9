//! Persistent study state for a flashcard application.
//!
//! `StudyStateStore` is the typed surface: card statuses, term breakdowns,
//! per-mode study settings and the custom card collection, each kept as its
//! own JSON document in a `DocumentStore`.
//!
//! Layers, bottom-up:
//! - `studystate-doc-store`: keys, snapshots, persistence, transactions
//! - `studystate-codec`: entity codecs and the legacy progress migration
//! - this crate: typed operations, configuration, collaborator traits
//!
//! # Example
//!
//! ```rust,no_run
//! use studystate::{StoreConfig, StudyMode, StudyStateStore};
//!
//! # async fn run() -> studystate::Result<()> {
//! let state = StudyStateStore::open(&StoreConfig::from_env()).await?;
//! let settings = state.settings_for(StudyMode::AllCards).await?;
//! println!("speech rate: {}", settings.speech_rate);
//! # Ok(())
//! # }
//! ```

mod collaborators;
mod config;
mod error;
pub mod keys;
mod state_store;

pub use collaborators::{apply_speech_settings, speech_text, CardCatalog, SpeechOutput, Voice};
pub use config::{StoreConfig, DATA_DIR_ENV};
pub use error::{Result, StudyStateError};
pub use state_store::StudyStateStore;

// Re-export the model so callers need only this crate.
pub use studystate_codec::{
    BreakdownPart, Breakdowns, CardStatus, FlashCard, LearnedViewMode, ProgressCounts,
    ProgressState, SortMode, StatusPartition, StudyMode, StudySettings, TermBreakdown,
};
pub use studystate_doc_store::{DocumentStore, StoreError};
