// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Mock store implementation for testing.
//!
//! This module provides [`MockStore`], a configurable in-memory store that
//! records all operations and supports failure injection for testing error
//! paths. Eviction raises lifecycle events like a real backend, but the mock
//! has a single tier, so an evicted entry is simply dropped.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{Error, ListenerRegistry, Registration, SessionStore, StoreEvent, StoreListener, StoreProperties};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp<K, V> {
    /// A get operation was performed with the given key.
    Get(K),
    /// An insert operation was performed with the given key and value.
    Insert {
        /// The key that was inserted.
        key: K,
        /// The value that was inserted.
        value: V,
    },
    /// A silent insert operation was performed with the given key and value.
    InsertSilent {
        /// The key that was inserted.
        key: K,
        /// The value that was inserted.
        value: V,
    },
    /// A remove operation was performed with the given key.
    Remove(K),
    /// A silent remove operation was performed with the given key.
    RemoveSilent(K),
    /// An evict operation was performed with the given key.
    Evict(K),
    /// A merge operation was performed with the given key.
    Merge(K),
}

impl<K, V> StoreOp<K, V> {
    /// Returns `true` if this operation wrote to the store.
    ///
    /// Gets and evictions are not writes; everything else is.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get(_) | Self::Evict(_))
    }
}

type FailPredicate<K, V> = Box<dyn Fn(&StoreOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock store for testing.
///
/// This store keeps values in memory and can be configured to fail
/// operations on demand, making it useful for testing error handling paths.
/// All operations are recorded for later verification, which is how the
/// session layer's write-elision guarantees are asserted.
///
/// # Examples
///
/// ```no_run
/// use satchel_store::{SessionStore, testing::{MockStore, StoreOp}};
///
/// # async fn example() {
/// let store = MockStore::<String, i32>::new();
///
/// store.insert(&"key".to_string(), 42).await.unwrap();
/// let value = store.get(&"key".to_string()).await.unwrap();
/// assert_eq!(value, Some(42));
///
/// assert_eq!(store.operations(), vec![
///     StoreOp::Insert { key: "key".to_string(), value: 42 },
///     StoreOp::Get("key".to_string()),
/// ]);
/// # }
/// ```
///
/// # Failure Injection
///
/// ```no_run
/// use satchel_store::{SessionStore, testing::{MockStore, StoreOp}};
///
/// # async fn example() {
/// let store: MockStore<String, i32> = MockStore::new();
///
/// // Fail all get operations
/// store.fail_when(|op| matches!(op, StoreOp::Get(_)));
/// assert!(store.get(&"key".to_string()).await.is_err());
/// # }
/// ```
pub struct MockStore<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    operations: Arc<Mutex<Vec<StoreOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
    listeners: ListenerRegistry<K, V>,
    properties: StoreProperties,
}

impl<K, V> std::fmt::Debug for MockStore<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("properties", &self.properties)
            .finish()
    }
}

impl<K, V> Clone for MockStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            listeners: self.listeners.clone(),
            properties: self.properties,
        }
    }
}

impl<K, V> Default for MockStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockStore<K, V> {
    /// Creates a new empty mock store with default properties
    /// (non-transactional, non-persistent).
    #[must_use]
    pub fn new() -> Self {
        Self::with_properties(StoreProperties::default())
    }

    /// Creates a new empty mock store reporting the given properties.
    #[must_use]
    pub fn with_properties(properties: StoreProperties) -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            listeners: ListenerRegistry::new(),
            properties,
        }
    }
}

impl<K, V> MockStore<K, V> {
    /// Returns the number of currently registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<K, V> MockStore<K, V>
where
    K: Eq + Hash,
{
    /// Returns the number of entries in the store.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if the store contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Returns the stored value for a key, without recording an operation.
    #[must_use]
    pub fn stored_value(&self, key: &K) -> Option<V> {
        self.data.lock().get(key).cloned()
    }
}

impl<K, V> MockStore<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should
    /// fail. Failed operations are still recorded.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Returns the recorded operations that wrote to the store.
    #[must_use]
    pub fn writes(&self) -> Vec<StoreOp<K, V>> {
        self.operations.lock().iter().filter(|op| op.is_write()).cloned().collect()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp<K, V>) {
        self.operations.lock().push(op);
    }

    fn check(&self, op: &StoreOp<K, V>) -> Result<(), Error> {
        let should_fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op));
        if should_fail {
            return Err(Error::from_message("mock: operation failed"));
        }
        Ok(())
    }
}

impl<K, V> SessionStore<K, V> for MockStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let op = StoreOp::Get(key.clone());
        let outcome = self.check(&op);
        self.record(op);
        outcome?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn insert(&self, key: &K, value: V) -> Result<(), Error> {
        let op = StoreOp::Insert {
            key: key.clone(),
            value: value.clone(),
        };
        let outcome = self.check(&op);
        self.record(op);
        outcome?;
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }

    async fn insert_silent(&self, key: &K, value: V) -> Result<(), Error> {
        let op = StoreOp::InsertSilent {
            key: key.clone(),
            value: value.clone(),
        };
        let outcome = self.check(&op);
        self.record(op);
        outcome?;
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &K) -> Result<(), Error> {
        let op = StoreOp::Remove(key.clone());
        let outcome = self.check(&op);
        self.record(op);
        outcome?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn remove_silent(&self, key: &K) -> Result<(), Error> {
        let op = StoreOp::RemoveSilent(key.clone());
        let outcome = self.check(&op);
        self.record(op);
        outcome?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn evict(&self, key: &K) -> Result<(), Error> {
        let op = StoreOp::Evict(key.clone());
        let outcome = self.check(&op);
        self.record(op);
        outcome?;

        let value = self.data.lock().get(key).cloned();
        if let Some(value) = value {
            self.listeners
                .dispatch(StoreEvent::PrePassivate {
                    key: key.clone(),
                    value,
                })
                .await;
            self.data.lock().remove(key);
        }
        Ok(())
    }

    async fn merge<F>(&self, key: &K, f: F) -> Result<Option<V>, Error>
    where
        F: FnOnce(Option<V>) -> Option<V> + Send,
    {
        let op = StoreOp::Merge(key.clone());
        let outcome = self.check(&op);
        self.record(op);
        outcome?;

        let mut data = self.data.lock();
        let current = data.get(key).cloned();
        match f(current) {
            Some(value) => {
                data.insert(key.clone(), value.clone());
                Ok(Some(value))
            }
            None => {
                data.remove(key);
                Ok(None)
            }
        }
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

    use super::*;

    #[test]
    fn records_operations_in_order() {
        block_on(async {
            let store = MockStore::<String, i32>::new();
            let key = "k".to_string();

            store.insert(&key, 1).await.expect("insert");
            let _ = store.get(&key).await.expect("get");
            store.remove(&key).await.expect("remove");

            assert_eq!(
                store.operations(),
                vec![
                    StoreOp::Insert { key: key.clone(), value: 1 },
                    StoreOp::Get(key.clone()),
                    StoreOp::Remove(key),
                ]
            );
        });
    }

    #[test]
    fn failure_injection_fails_matching_ops() {
        block_on(async {
            let store = MockStore::<String, i32>::new();
            store.fail_when(|op| matches!(op, StoreOp::Get(_)));

            store.insert(&"k".to_string(), 1).await.expect("insert unaffected");
            assert!(store.get(&"k".to_string()).await.is_err());

            store.clear_failures();
            assert_eq!(store.get(&"k".to_string()).await.expect("get"), Some(1));
        });
    }

    #[tokio::test]
    async fn merge_applies_transform_atomically() {
        let store = MockStore::<String, i32>::new();
        let key = "k".to_string();

        let stored = store.merge(&key, |current| Some(current.unwrap_or(0) + 5)).await.expect("merge");
        assert_eq!(stored, Some(5));

        let stored = store.merge(&key, |_| None).await.expect("merge");
        assert_eq!(stored, None);
        assert!(!store.contains_key(&key));
    }

    #[test]
    fn evict_raises_pre_passivate_then_drops() {
        use futures::future::BoxFuture;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Seen(AtomicUsize);

        impl StoreListener<String, i32> for Seen {
            fn handle(&self, event: StoreEvent<String, i32>) -> BoxFuture<'_, ()> {
                if matches!(event, StoreEvent::PrePassivate { .. }) {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
                Box::pin(async {})
            }
        }

        block_on(async {
            let store = MockStore::<String, i32>::new();
            let seen = Arc::new(Seen(AtomicUsize::new(0)));
            let _registration = store.register(Arc::clone(&seen) as Arc<dyn StoreListener<String, i32>>);

            store.insert(&"k".to_string(), 9).await.expect("insert");
            store.evict(&"k".to_string()).await.expect("evict");

            assert_eq!(seen.0.load(Ordering::SeqCst), 1);
            assert!(!store.contains_key(&"k".to_string()));

            // Evicting an absent entry raises nothing.
            store.evict(&"k".to_string()).await.expect("evict");
            assert_eq!(seen.0.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn writes_excludes_reads_and_evictions() {
        block_on(async {
            let store = MockStore::<String, i32>::new();
            let key = "k".to_string();

            store.insert(&key, 1).await.expect("insert");
            let _ = store.get(&key).await.expect("get");
            store.evict(&key).await.expect("evict");

            assert_eq!(store.writes(), vec![StoreOp::Insert { key, value: 1 }]);
        });
    }
}
