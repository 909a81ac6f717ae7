// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! In-process store implementation using moka.
//!
//! This module provides a session store whose hot tier is backed by the moka
//! crate, with a separate passivation tier that makes eviction and
//! activation observable through store events.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use parking_lot::Mutex;
use satchel_store::{Error, ListenerRegistry, Registration, SessionStore, StoreEvent, StoreListener, StoreProperties};

use crate::builder::MemoryStoreBuilder;

/// An in-process session store with an observable passivation tier.
///
/// Hot entries live in a concurrent moka cache. [`evict`](SessionStore::evict)
/// moves an entry to the passivation tier after raising
/// [`StoreEvent::PrePassivate`]; a later [`get`](SessionStore::get) moves it
/// back and raises [`StoreEvent::PostActivate`]. Logical removal clears both
/// tiers and raises nothing, mirroring the distinction a replicated cache
/// draws between invalidation and passivation.
///
/// Capacity-driven eviction is the business of a real cache engine; this
/// store only passivates on explicit `evict` calls, which keeps event
/// delivery deterministic.
///
/// # Examples
///
/// ```
/// use satchel_memory::MemoryStore;
/// use satchel_store::SessionStore;
/// # futures::executor::block_on(async {
///
/// let store = MemoryStore::<String, i32>::new();
///
/// store.insert(&"key".to_string(), 42).await?;
/// let value = store.get(&"key".to_string()).await?;
/// assert_eq!(value, Some(42));
/// # Ok::<(), satchel_store::Error>(())
/// # });
/// ```
pub struct MemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    hot: Cache<K, V>,
    passive: Arc<Mutex<HashMap<K, V>>>,
    listeners: ListenerRegistry<K, V>,
    properties: StoreProperties,
}

impl<K, V> Clone for MemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            hot: self.hot.clone(),
            passive: Arc::clone(&self.passive),
            listeners: self.listeners.clone(),
            properties: self.properties,
        }
    }
}

impl<K, V> std::fmt::Debug for MemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new store with default properties
    /// (non-transactional, non-persistent).
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new builder for configuring a store.
    #[must_use]
    pub fn builder() -> MemoryStoreBuilder<K, V> {
        MemoryStoreBuilder::new()
    }

    /// Constructs a `MemoryStore` from a builder.
    ///
    /// This is called by `MemoryStoreBuilder::build()` and should not be
    /// called directly by users.
    pub(crate) fn from_builder(builder: &MemoryStoreBuilder<K, V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            hot: moka_builder.build(),
            passive: Arc::new(Mutex::new(HashMap::new())),
            listeners: ListenerRegistry::new(),
            properties: builder.properties(),
        }
    }

    /// Returns `true` if either tier holds an entry for the key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.hot.contains_key(key) || self.passive.lock().contains_key(key)
    }

    /// Returns `true` if the entry for the key sits in the passivation tier.
    #[must_use]
    pub fn is_passivated(&self, key: &K) -> bool {
        !self.hot.contains_key(key) && self.passive.lock().contains_key(key)
    }
}

impl<K, V> SessionStore<K, V> for MemoryStore<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        if let Some(value) = self.hot.get(key).await {
            return Ok(Some(value));
        }

        let passivated = self.passive.lock().remove(key);
        match passivated {
            Some(value) => {
                self.hot.insert(key.clone(), value.clone()).await;
                self.listeners
                    .dispatch(StoreEvent::PostActivate {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .await;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, key: &K, value: V) -> Result<(), Error> {
        self.hot.insert(key.clone(), value).await;
        self.passive.lock().remove(key);
        Ok(())
    }

    async fn insert_silent(&self, key: &K, value: V) -> Result<(), Error> {
        // Locally indistinguishable from insert; a replicated backend would
        // skip cross-node notification here.
        self.insert(key, value).await
    }

    async fn remove(&self, key: &K) -> Result<(), Error> {
        self.hot.invalidate(key).await;
        self.passive.lock().remove(key);
        Ok(())
    }

    async fn remove_silent(&self, key: &K) -> Result<(), Error> {
        self.remove(key).await
    }

    async fn evict(&self, key: &K) -> Result<(), Error> {
        let Some(value) = self.hot.get(key).await else {
            return Ok(());
        };

        // The pre event completes while the entry is still logically hot.
        self.listeners
            .dispatch(StoreEvent::PrePassivate {
                key: key.clone(),
                value: value.clone(),
            })
            .await;

        self.hot.invalidate(key).await;
        self.passive.lock().insert(key.clone(), value);
        Ok(())
    }

    async fn merge<F>(&self, key: &K, f: F) -> Result<Option<V>, Error>
    where
        F: FnOnce(Option<V>) -> Option<V> + Send,
    {
        // A merge is a write-path operation: a passivated entry is restored
        // without raising an activation event.
        let passivated = self.passive.lock().remove(key);
        if let Some(value) = passivated {
            self.hot.insert(key.clone(), value).await;
        }

        let result = self
            .hot
            .entry(key.clone())
            .and_compute_with(|entry| {
                let next = f(entry.map(moka::Entry::into_value));
                std::future::ready(match next {
                    Some(value) => Op::Put(value),
                    None => Op::Remove,
                })
            })
            .await;

        Ok(match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) | CompResult::Unchanged(entry) => {
                Some(entry.into_value())
            }
            CompResult::Removed(_) | CompResult::StillNone(_) => None,
        })
    }

    fn properties(&self) -> StoreProperties {
        self.properties
    }

    fn register(&self, listener: Arc<dyn StoreListener<K, V>>) -> Registration {
        self.listeners.register(listener)
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Recording {
        passivated: AtomicUsize,
        activated: AtomicUsize,
    }

    impl StoreListener<String, i32> for Recording {
        fn handle(&self, event: StoreEvent<String, i32>) -> BoxFuture<'_, ()> {
            match event {
                StoreEvent::PrePassivate { .. } => self.passivated.fetch_add(1, Ordering::SeqCst),
                StoreEvent::PostActivate { .. } => self.activated.fetch_add(1, Ordering::SeqCst),
            };
            Box::pin(async {})
        }
    }

    #[test]
    fn evict_then_get_round_trips_through_passivation() {
        block_on(async {
            let store = MemoryStore::<String, i32>::new();
            let key = "s".to_string();

            store.insert(&key, 3).await.expect("insert");
            store.evict(&key).await.expect("evict");
            assert!(store.is_passivated(&key));

            let value = store.get(&key).await.expect("get");
            assert_eq!(value, Some(3));
            assert!(!store.is_passivated(&key));
        });
    }

    #[test]
    fn lifecycle_events_fire_once_per_transition() {
        block_on(async {
            let store = MemoryStore::<String, i32>::new();
            let listener = Arc::new(Recording::default());
            let _registration = store.register(Arc::clone(&listener) as Arc<dyn StoreListener<String, i32>>);

            let key = "s".to_string();
            store.insert(&key, 3).await.expect("insert");
            store.evict(&key).await.expect("evict");
            store.evict(&key).await.expect("evict absent from hot tier");
            let _ = store.get(&key).await.expect("get");
            let _ = store.get(&key).await.expect("get hot");

            assert_eq!(listener.passivated.load(Ordering::SeqCst), 1);
            assert_eq!(listener.activated.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn remove_clears_both_tiers_without_events() {
        block_on(async {
            let store = MemoryStore::<String, i32>::new();
            let listener = Arc::new(Recording::default());
            let _registration = store.register(Arc::clone(&listener) as Arc<dyn StoreListener<String, i32>>);

            let key = "s".to_string();
            store.insert(&key, 3).await.expect("insert");
            store.evict(&key).await.expect("evict");
            store.remove(&key).await.expect("remove");

            assert!(!store.contains_key(&key));
            assert_eq!(listener.activated.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn merge_restores_passivated_entry_silently() {
        block_on(async {
            let store = MemoryStore::<String, i32>::new();
            let listener = Arc::new(Recording::default());
            let _registration = store.register(Arc::clone(&listener) as Arc<dyn StoreListener<String, i32>>);

            let key = "s".to_string();
            store.insert(&key, 3).await.expect("insert");
            store.evict(&key).await.expect("evict");

            let merged = store.merge(&key, |current| current.map(|v| v + 1)).await.expect("merge");
            assert_eq!(merged, Some(4));
            assert_eq!(listener.activated.load(Ordering::SeqCst), 0);
            assert_eq!(store.get(&key).await.expect("get"), Some(4));
        });
    }

    #[test]
    fn merge_to_none_removes_entry() {
        block_on(async {
            let store = MemoryStore::<String, i32>::new();
            let key = "s".to_string();

            store.insert(&key, 3).await.expect("insert");
            let merged = store.merge(&key, |_| None).await.expect("merge");
            assert_eq!(merged, None);
            assert!(!store.contains_key(&key));
        });
    }

    #[test]
    fn merge_creates_absent_entry() {
        block_on(async {
            let store = MemoryStore::<String, i32>::new();
            let key = "s".to_string();

            let merged = store.merge(&key, |current| Some(current.unwrap_or(0) + 7)).await.expect("merge");
            assert_eq!(merged, Some(7));
        });
    }

    #[test]
    fn thread_safe_type() {
        use static_assertions::assert_impl_all;

        assert_impl_all!(MemoryStore<String, i32>: Send, Sync, Clone);
    }

    #[tokio::test]
    async fn concurrent_merges_do_not_lose_updates() {
        let store = Arc::new(MemoryStore::<String, i32>::new());
        let key = "s".to_string();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move {
                    store.merge(&key, |current| Some(current.unwrap_or(0) + 1)).await.expect("merge");
                })
            })
            .collect();

        for task in tasks {
            task.await.expect("merge task");
        }

        assert_eq!(store.get(&key).await.expect("get"), Some(16));
    }

    #[test]
    fn builder_reports_declared_properties() {
        let store = MemoryStore::<String, i32>::builder()
            .transactional(true)
            .persistent(true)
            .build();

        assert!(store.properties().transactional());
        assert!(store.properties().persistent());
    }
}
