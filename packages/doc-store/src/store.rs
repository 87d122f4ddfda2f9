//! The document store: per-key transactions over a persistence backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::observe::{Observation, Subscribers};
use crate::{DocKey, MemoryPersistence, Persistence, Snapshot, StoreError};

/// A read-modify-write step applied inside `transact`.
///
/// Receives the committed raw text for the key (or `None` when absent) and
/// returns the raw text to commit in its place.
pub type Transform = Box<dyn FnOnce(Option<&str>) -> String + Send>;

/// A `Transform` that also reads the committed values of other keys.
///
/// The second argument holds the context keys named in `transact_with`,
/// restricted to those present.
pub type ContextTransform = Box<dyn FnOnce(Option<&str>, &Snapshot) -> String + Send>;

/// A mapping from document keys to raw JSON text.
///
/// # Consistency
///
/// - `transact` bodies on the same key never interleave and run in
///   submission order. Different keys proceed independently.
/// - Readers and observers only ever see committed snapshots. A write whose
///   persistence fails leaves no trace.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One-shot read of the listed keys.
    async fn snapshot(&self, keys: &[DocKey]) -> Result<Snapshot, StoreError>;

    /// One-shot read of a single key.
    async fn get(&self, key: &DocKey) -> Result<Option<String>, StoreError> {
        let snapshot = self.snapshot(std::slice::from_ref(key)).await?;
        Ok(snapshot.get(key).map(str::to_string))
    }

    /// Observe several keys as one consistent view.
    async fn observe_many(&self, keys: &[DocKey]) -> Result<Observation, StoreError>;

    /// Observe the raw value of a single key.
    async fn observe(
        &self,
        key: &DocKey,
    ) -> Result<BoxStream<'static, Option<String>>, StoreError> {
        let key = key.clone();
        let observation = self.observe_many(std::slice::from_ref(&key)).await?;
        Ok(observation
            .map(move |snapshot| snapshot.get(&key).map(str::to_string))
            .boxed())
    }

    /// Atomically replace the value at `key` with `transform(current)`.
    ///
    /// Returns the committed raw text.
    async fn transact(&self, key: &DocKey, transform: Transform) -> Result<String, StoreError> {
        self.transact_with(
            key,
            &[],
            Box::new(move |raw: Option<&str>, _: &Snapshot| transform(raw)),
        )
        .await
    }

    /// Like `transact`, but the transform also receives the committed values
    /// of `context`.
    ///
    /// The context is read after the lock on `key` is held, so a
    /// `remove_keys` covering `key` and the context keys is either fully
    /// visible or not at all.
    async fn transact_with(
        &self,
        key: &DocKey,
        context: &[DocKey],
        transform: ContextTransform,
    ) -> Result<String, StoreError>;

    /// Remove every listed key in a single commit.
    async fn remove_keys(&self, keys: &[DocKey]) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn snapshot(&self, keys: &[DocKey]) -> Result<Snapshot, StoreError> {
        self.as_ref().snapshot(keys).await
    }

    async fn observe_many(&self, keys: &[DocKey]) -> Result<Observation, StoreError> {
        self.as_ref().observe_many(keys).await
    }

    async fn transact(&self, key: &DocKey, transform: Transform) -> Result<String, StoreError> {
        self.as_ref().transact(key, transform).await
    }

    async fn transact_with(
        &self,
        key: &DocKey,
        context: &[DocKey],
        transform: ContextTransform,
    ) -> Result<String, StoreError> {
        self.as_ref().transact_with(key, context, transform).await
    }

    async fn remove_keys(&self, keys: &[DocKey]) -> Result<(), StoreError> {
        self.as_ref().remove_keys(keys).await
    }
}

struct CommitState {
    committed: Snapshot,
    subscribers: Subscribers,
}

/// A `DocumentStore` whose committed state is mirrored to a `Persistence`
/// backend.
///
/// Two lock levels are used:
///
/// - one FIFO async lock per key, held for the whole read-modify-write, which
///   gives per-key serialization;
/// - one commit lock, held while a new document set is persisted and
///   published, which lets writes to different keys merge into the latest
///   committed set.
///
/// # Example
///
/// ```rust
/// use studystate_doc_store::{doc_key, DocumentStore, PersistentStore};
///
/// # futures::executor::block_on(async {
/// let store = PersistentStore::in_memory();
/// let key = doc_key!("counter");
///
/// store
///     .transact(&key, Box::new(|raw: Option<&str>| {
///         let n: u32 = raw.and_then(|s| s.parse().ok()).unwrap_or(0);
///         (n + 1).to_string()
///     }))
///     .await
///     .unwrap();
///
/// assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("1"));
/// # });
/// ```
pub struct PersistentStore<P> {
    persistence: P,
    state: AsyncMutex<CommitState>,
    key_locks: Mutex<HashMap<DocKey, Arc<AsyncMutex<()>>>>,
}

impl PersistentStore<MemoryPersistence> {
    /// A store that keeps everything in process memory.
    pub fn in_memory() -> Self {
        Self::with_snapshot(MemoryPersistence::new(), Snapshot::new())
    }
}

impl<P: Persistence> PersistentStore<P> {
    /// Open a store, loading the committed document set from `persistence`.
    pub async fn open(persistence: P) -> Result<Self, StoreError> {
        let committed = persistence.load().await?;
        tracing::debug!(documents = committed.len(), "opened document store");
        Ok(Self::with_snapshot(persistence, committed))
    }

    fn with_snapshot(persistence: P, committed: Snapshot) -> Self {
        Self {
            persistence,
            state: AsyncMutex::new(CommitState {
                committed,
                subscribers: Subscribers::default(),
            }),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Number of live observations (dropped ones are pruned on the next
    /// commit that concerns them).
    pub async fn subscriber_count(&self) -> usize {
        self.state.lock().await.subscribers.len()
    }

    fn key_lock(&self, key: &DocKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .key_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(key.clone()).or_default().clone()
    }

    async fn lock_keys(&self, keys: &[DocKey]) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.key_lock(key).lock_owned().await);
        }
        guards
    }

    /// Persist `candidate` and, only on success, publish it.
    async fn commit(
        &self,
        state: &mut CommitState,
        candidate: Snapshot,
        touched: &[DocKey],
    ) -> Result<(), StoreError> {
        if let Err(err) = self.persistence.persist(&candidate).await {
            tracing::error!(error = %err, keys = ?touched, "failed to persist documents");
            return Err(err);
        }

        state.committed = candidate;
        state.subscribers.notify(&state.committed, touched);
        tracing::debug!(keys = ?touched, "committed documents");
        Ok(())
    }
}

#[async_trait]
impl<P: Persistence> DocumentStore for PersistentStore<P> {
    async fn snapshot(&self, keys: &[DocKey]) -> Result<Snapshot, StoreError> {
        Ok(self.state.lock().await.committed.restrict(keys))
    }

    async fn observe_many(&self, keys: &[DocKey]) -> Result<Observation, StoreError> {
        let mut state = self.state.lock().await;
        let CommitState {
            committed,
            subscribers,
        } = &mut *state;
        Ok(subscribers.subscribe(keys, committed))
    }

    async fn transact_with(
        &self,
        key: &DocKey,
        context: &[DocKey],
        transform: ContextTransform,
    ) -> Result<String, StoreError> {
        let key_lock = self.key_lock(key);
        let _key_guard = key_lock.lock().await;

        let (current, context) = {
            let state = self.state.lock().await;
            (
                state.committed.get(key).map(str::to_string),
                state.committed.restrict(context),
            )
        };

        // Run outside the commit lock so slow transforms only hold up this key.
        let next = transform(current.as_deref(), &context);

        let mut state = self.state.lock().await;
        let candidate = state.committed.with(key.clone(), next.clone());
        self.commit(&mut state, candidate, std::slice::from_ref(key))
            .await?;
        Ok(next)
    }

    async fn remove_keys(&self, keys: &[DocKey]) -> Result<(), StoreError> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        // Sorted acquisition keeps concurrent multi-key removals deadlock-free.
        let _key_guards = self.lock_keys(&keys).await;

        let mut state = self.state.lock().await;
        let touched: Vec<DocKey> = keys
            .into_iter()
            .filter(|key| state.committed.contains(key))
            .collect();
        if touched.is_empty() {
            return Ok(());
        }

        let candidate = state.committed.without(&touched);
        self.commit(&mut state, candidate, &touched).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc_key, JsonFilePersistence};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn increment() -> Transform {
        Box::new(|raw: Option<&str>| {
            let n: u64 = raw.and_then(|s| s.parse().ok()).unwrap_or(0);
            (n + 1).to_string()
        })
    }

    fn set(value: &str) -> Transform {
        let value = value.to_string();
        Box::new(move |_: Option<&str>| value)
    }

    /// A backend that fails every persist while `failing` is set.
    #[derive(Default)]
    struct FlakyPersistence {
        inner: MemoryPersistence,
        failing: AtomicBool,
    }

    #[async_trait]
    impl Persistence for FlakyPersistence {
        async fn load(&self) -> Result<Snapshot, StoreError> {
            self.inner.load().await
        }

        async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::io(
                    "writing test state",
                    std::io::Error::other("disk full"),
                ));
            }
            self.inner.persist(snapshot).await
        }
    }

    #[tokio::test]
    async fn transact_sees_absence_then_previous_value() {
        let store = PersistentStore::in_memory();
        let key = doc_key!("counter");

        assert_eq!(store.transact(&key, increment()).await.unwrap(), "1");
        assert_eq!(store.transact(&key, increment()).await.unwrap(), "2");
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.get(&doc_key!("other")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn transact_persists_through_backend() {
        let store = PersistentStore::in_memory();
        store.transact(&doc_key!("a"), set("[1]")).await.unwrap();

        let persisted = store.persistence().load().await.unwrap();
        assert_eq!(persisted.get(&doc_key!("a")), Some("[1]"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transacts_on_one_key_lose_no_updates() {
        let store = Arc::new(PersistentStore::in_memory());
        let key = doc_key!("counter");

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                let key = key.clone();
                tokio::spawn(async move { store.transact(&key, increment()).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("64"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transacts_on_distinct_keys_all_commit() {
        let store = Arc::new(PersistentStore::in_memory());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let key = DocKey::parse(&format!("key_{}", i)).unwrap();
                    for _ in 0..8 {
                        store.transact(&key, increment()).await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let persisted = store.persistence().load().await.unwrap();
        assert_eq!(persisted.len(), 16);
        assert!(persisted.iter().all(|(_, value)| value == "8"));
    }

    #[tokio::test]
    async fn observe_emits_current_then_each_commit() {
        let store = PersistentStore::in_memory();
        let key = doc_key!("doc");
        store.transact(&key, set("\"first\"")).await.unwrap();

        let mut values = store.observe(&key).await.unwrap();
        assert_eq!(values.next().await, Some(Some("\"first\"".to_string())));

        store.transact(&key, set("\"second\"")).await.unwrap();
        store.transact(&doc_key!("unrelated"), set("0")).await.unwrap();
        store.transact(&key, set("\"third\"")).await.unwrap();
        store.remove_keys(&[key.clone()]).await.unwrap();

        assert_eq!(values.next().await, Some(Some("\"second\"".to_string())));
        assert_eq!(values.next().await, Some(Some("\"third\"".to_string())));
        assert_eq!(values.next().await, Some(None));
    }

    #[tokio::test]
    async fn observe_many_sees_consistent_multi_key_view() {
        let store = PersistentStore::in_memory();
        let (a, b) = (doc_key!("a"), doc_key!("b"));
        store.transact(&a, set("1")).await.unwrap();
        store.transact(&b, set("2")).await.unwrap();

        let mut observation = store.observe_many(&[a.clone(), b.clone()]).await.unwrap();
        let first = observation.recv().await.unwrap();
        assert_eq!(first.len(), 2);

        store.remove_keys(&[a.clone(), b.clone()]).await.unwrap();
        // One commit, one delivery, both keys gone together.
        let after = observation.recv().await.unwrap();
        assert!(after.is_empty());
        assert!(observation.try_recv().is_none());
    }

    #[tokio::test]
    async fn failed_persist_keeps_prior_value_and_is_not_observed() {
        let store = PersistentStore::open(FlakyPersistence::default())
            .await
            .unwrap();
        let key = doc_key!("doc");
        store.transact(&key, set("\"good\"")).await.unwrap();

        let mut observation = store.observe_many(&[key.clone()]).await.unwrap();
        observation.recv().await.unwrap();

        store.persistence().failing.store(true, Ordering::SeqCst);
        let err = store.transact(&key, set("\"bad\"")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.remove_keys(&[key.clone()]).await.is_err());

        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("\"good\""));
        assert!(observation.try_recv().is_none());

        store.persistence().failing.store(false, Ordering::SeqCst);
        store.transact(&key, set("\"better\"")).await.unwrap();
        let next = observation.recv().await.unwrap();
        assert_eq!(next.get(&key), Some("\"better\""));
    }

    #[tokio::test]
    async fn transact_with_reads_context_under_the_key_lock() {
        let store = Arc::new(PersistentStore::in_memory());
        let (target, extra) = (doc_key!("target"), doc_key!("extra"));
        store.transact(&extra, set("5")).await.unwrap();

        let committed = store
            .transact_with(
                &target,
                &[extra.clone(), doc_key!("missing")],
                Box::new(|raw: Option<&str>, context: &Snapshot| {
                    assert_eq!(raw, None);
                    assert_eq!(context.len(), 1);
                    format!("{}+1", context.get(&doc_key!("extra")).unwrap_or("0"))
                }),
            )
            .await
            .unwrap();
        assert_eq!(committed, "5+1");

        // Hold the target lock so a removal of both keys queues behind it.
        let guard = store.key_lock(&target).lock_owned().await;
        let remover = {
            let store = store.clone();
            let keys = [target.clone(), extra.clone()];
            tokio::spawn(async move { store.remove_keys(&keys).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(store.get(&extra).await.unwrap().as_deref(), Some("5"));
        drop(guard);
        remover.await.unwrap().unwrap();

        let committed = store
            .transact_with(
                &target,
                std::slice::from_ref(&extra),
                Box::new(|raw: Option<&str>, context: &Snapshot| {
                    assert_eq!(raw, None);
                    assert!(context.is_empty());
                    "fresh".to_string()
                }),
            )
            .await
            .unwrap();
        assert_eq!(committed, "fresh");
    }

    #[tokio::test]
    async fn removing_absent_keys_is_a_no_op() {
        let store = PersistentStore::in_memory();
        let mut observation = store.observe_many(&[doc_key!("a")]).await.unwrap();
        observation.recv().await.unwrap();

        store.remove_keys(&[doc_key!("a"), doc_key!("a")]).await.unwrap();
        assert!(observation.try_recv().is_none());
    }

    #[tokio::test]
    async fn dropped_observers_stop_receiving() {
        let store = PersistentStore::in_memory();
        let key = doc_key!("doc");
        let observation = store.observe_many(&[key.clone()]).await.unwrap();
        assert_eq!(store.subscriber_count().await, 1);

        drop(observation);
        store.transact(&key, set("1")).await.unwrap();
        assert_eq!(store.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn reopening_file_store_restores_committed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let open = || async {
            let backend =
                JsonFilePersistence::new(dir.path().to_path_buf(), "state.json").unwrap();
            PersistentStore::open(backend).await.unwrap()
        };

        {
            let store = open().await;
            store.transact(&doc_key!("a"), set("{\"x\":1}")).await.unwrap();
            store.transact(&doc_key!("b"), set("[]")).await.unwrap();
            store.remove_keys(&[doc_key!("b")]).await.unwrap();
        }

        let store = open().await;
        let snapshot = store.snapshot(&[doc_key!("a"), doc_key!("b")]).await.unwrap();
        assert_eq!(snapshot.get(&doc_key!("a")), Some("{\"x\":1}"));
        assert!(!snapshot.contains(&doc_key!("b")));
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let store: Arc<dyn DocumentStore> = Arc::new(PersistentStore::in_memory());
        store.transact(&doc_key!("k"), set("true")).await.unwrap();
        assert_eq!(store.get(&doc_key!("k")).await.unwrap().as_deref(), Some("true"));
    }
}
