//! Error types for the study state facade.

use std::path::PathBuf;

use thiserror::Error;

use studystate_doc_store::StoreError;

/// Errors surfaced by study state operations.
///
/// Only storage failures appear here. Unreadable documents are decoded to
/// their defaults instead of failing.
#[derive(Debug, Error)]
pub enum StudyStateError {
    /// A document store operation failed. The previously committed value
    /// is still in place.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The configured data directory could not be created.
    #[error("cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for study state operations.
pub type Result<T> = std::result::Result<T, StudyStateError>;
