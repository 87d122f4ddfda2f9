//! Document store for per-user study state.
//!
//! A small key/value layer where each key names one independently versioned
//! JSON document:
//! - `DocKey`: validated document key
//! - `Snapshot`: immutable committed view of some documents
//! - `Persistence`: backend that loads and atomically replaces the document set
//! - `DocumentStore`: observe, transact and remove operations with per-key
//!   serialization
//!
//! The store never interprets document contents; decoding belongs to the
//! codec layer above it.
//!
//! # Example
//!
//! ```rust
//! use futures::StreamExt;
//! use studystate_doc_store::{doc_key, DocumentStore, PersistentStore};
//!
//! # futures::executor::block_on(async {
//! let store = PersistentStore::in_memory();
//! let key = doc_key!("settings_all_json");
//!
//! let mut values = store.observe(&key).await.unwrap();
//! assert_eq!(values.next().await, Some(None));
//!
//! store
//!     .transact(&key, Box::new(|_: Option<&str>| "{}".to_string()))
//!     .await
//!     .unwrap();
//! assert_eq!(values.next().await, Some(Some("{}".to_string())));
//! # });
//! ```

mod error;
mod key;
mod local_disk;
mod observe;
mod persistence;
mod snapshot;
mod store;

pub use error::StoreError;
pub use key::{DocKey, KeyError};
pub use local_disk::JsonFilePersistence;
pub use observe::Observation;
pub use persistence::{MemoryPersistence, Persistence};
pub use snapshot::Snapshot;
pub use store::{ContextTransform, DocumentStore, PersistentStore, Transform};
