//! Persistence backends: the layer below the store.
//!
//! A backend only knows how to load and replace the *whole* document set.
//! Per-key serialization, observation and merge logic live in the store.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Snapshot, StoreError};

/// Durable storage for a complete document set.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn Persistence>`.
///
/// # Contract
///
/// `persist` must replace the stored set as a single unit: after a failed
/// call the previously persisted set is still the one `load` returns.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Load the persisted document set. A backend with nothing stored yet
    /// returns an empty snapshot.
    async fn load(&self) -> Result<Snapshot, StoreError>;

    /// Durably replace the persisted document set with `snapshot`.
    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: Persistence + ?Sized> Persistence for Box<T> {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        self.as_ref().load().await
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.as_ref().persist(snapshot).await
    }
}

/// Volatile persistence held in process memory.
///
/// # Example
///
/// ```rust
/// use studystate_doc_store::{doc_key, MemoryPersistence, Persistence, Snapshot};
///
/// # futures::executor::block_on(async {
/// let backend = MemoryPersistence::new();
/// let snapshot: Snapshot = [(doc_key!("greeting"), "\"hi\"".to_string())]
///     .into_iter()
///     .collect();
/// backend.persist(&snapshot).await.unwrap();
/// assert_eq!(backend.load().await.unwrap(), snapshot);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    documents: Mutex<Snapshot>,
}

impl MemoryPersistence {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend seeded with initial documents.
    pub fn with_data(documents: Snapshot) -> Self {
        Self {
            documents: Mutex::new(documents),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.lock().clone())
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        *self.lock() = snapshot.clone();
        Ok(())
    }
}
