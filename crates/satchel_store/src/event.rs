// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Lifecycle events delivered by store implementations.
//!
//! A store raises a [`StoreEvent`] whenever an entry crosses a storage-tier
//! boundary: [`StoreEvent::PrePassivate`] fires before an entry leaves the
//! primary tier, [`StoreEvent::PostActivate`] fires after a previously
//! passivated entry is reloaded. Listeners subscribe through
//! [`ListenerRegistry::register`] and hold on to the returned
//! [`Registration`] guard; dropping the guard deregisters the listener.

use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use parking_lot::Mutex;

/// A lifecycle transition observed on a store entry.
///
/// Events carry the affected key and a snapshot of the entry's value at the
/// time of the transition. Delivery is synchronous with respect to the store
/// operation that caused the transition: `PrePassivate` completes before the
/// entry leaves the primary tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent<K, V> {
    /// The entry for `key` is about to be passivated out of the primary tier.
    PrePassivate {
        /// Key of the entry leaving the primary tier.
        key: K,
        /// Value of the entry at the time of passivation.
        value: V,
    },
    /// The entry for `key` was just reloaded into the primary tier.
    PostActivate {
        /// Key of the reloaded entry.
        key: K,
        /// Value of the entry as reloaded.
        value: V,
    },
}

impl<K, V> StoreEvent<K, V> {
    /// Returns the key the event refers to.
    pub fn key(&self) -> &K {
        match self {
            Self::PrePassivate { key, .. } | Self::PostActivate { key, .. } => key,
        }
    }
}

/// A subscriber for store lifecycle events.
///
/// Listener dispatch runs on the task performing the store operation that
/// raised the event, so implementations must not block indefinitely. A
/// listener may call back into the store that delivered the event; stores
/// guarantee that no internal locks are held across dispatch.
pub trait StoreListener<K, V>: Send + Sync {
    /// Handles a single lifecycle event.
    fn handle(&self, event: StoreEvent<K, V>) -> BoxFuture<'_, ()>;
}

/// A registered listener subscription.
///
/// Deregistration is tied to this guard: dropping it (or calling
/// [`Registration::close`]) removes the listener from the registry it was
/// created by. Registrations held by a component should be released in that
/// component's own shutdown path.
pub struct Registration {
    unregister: Option<Box<dyn FnOnce() + Send>>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("open", &self.unregister.is_some())
            .finish()
    }
}

impl Registration {
    /// Creates a registration guard around a deregistration action.
    ///
    /// Store implementations call this from their `register` method; the
    /// action runs exactly once, on drop or on [`Registration::close`].
    #[must_use]
    pub fn new(unregister: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unregister: Some(Box::new(unregister)),
        }
    }

    /// Deregisters the listener now instead of waiting for drop.
    pub fn close(mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister();
        }
    }
}

/// A set of listeners shared by a store implementation.
///
/// Stores embed a registry and call [`ListenerRegistry::dispatch`] from the
/// operations that cross tier boundaries. The registry clones the event for
/// each listener and never holds its internal lock across listener dispatch,
/// so listeners are free to invoke further store operations.
pub struct ListenerRegistry<K, V> {
    inner: Arc<Mutex<ListenerTable<K, V>>>,
}

struct ListenerTable<K, V> {
    next_id: u64,
    listeners: Vec<(u64, Arc<dyn StoreListener<K, V>>)>,
}

impl<K, V> ListenerRegistry<K, V> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Adds a listener and returns the guard controlling its lifetime.
    pub fn register(&self, listener: Arc<dyn StoreListener<K, V>>) -> Registration
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let id = {
            let mut table = self.inner.lock();
            let id = table.next_id;
            table.next_id += 1;
            table.listeners.push((id, listener));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Registration::new(move || Self::unregister(&weak, id))
    }

    fn unregister(weak: &Weak<Mutex<ListenerTable<K, V>>>, id: u64) {
        if let Some(inner) = weak.upgrade() {
            inner.lock().listeners.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    /// Returns the number of currently registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Returns `true` if no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers an event to every registered listener, in registration order.
    pub async fn dispatch(&self, event: StoreEvent<K, V>)
    where
        K: Clone,
        V: Clone,
    {
        let listeners: Vec<_> = {
            let table = self.inner.lock();
            table.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
        };

        for listener in listeners {
            listener.handle(event.clone()).await;
        }
    }
}

impl<K, V> Default for ListenerRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for ListenerRegistry<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> std::fmt::Debug for ListenerRegistry<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting(AtomicUsize);

    impl StoreListener<String, u32> for Counting {
        fn handle(&self, _event: StoreEvent<String, u32>) -> BoxFuture<'_, ()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }
    }

    fn event() -> StoreEvent<String, u32> {
        StoreEvent::PrePassivate {
            key: "k".to_string(),
            value: 7,
        }
    }

    #[test]
    fn dispatch_reaches_registered_listener() {
        let registry = ListenerRegistry::new();
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        let registration = registry.register(Arc::clone(&listener) as Arc<dyn StoreListener<String, u32>>);

        futures::executor::block_on(registry.dispatch(event()));

        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
        drop(registration);
    }

    #[test]
    fn dropping_registration_deregisters() {
        let registry = ListenerRegistry::new();
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        let registration = registry.register(Arc::clone(&listener) as Arc<dyn StoreListener<String, u32>>);

        assert_eq!(registry.len(), 1);
        drop(registration);
        assert_eq!(registry.len(), 0);

        futures::executor::block_on(registry.dispatch(event()));
        assert_eq!(listener.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_deregisters_eagerly() {
        let registry = ListenerRegistry::<String, u32>::new();
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        let registration = registry.register(listener as Arc<dyn StoreListener<String, u32>>);

        registration.close();
        assert!(registry.is_empty());
    }

    #[test]
    fn event_key_is_uniform_across_variants() {
        let passivate = StoreEvent::PrePassivate {
            key: "a".to_string(),
            value: 1u32,
        };
        let activate = StoreEvent::PostActivate {
            key: "a".to_string(),
            value: 1u32,
        };
        assert_eq!(passivate.key(), activate.key());
    }
}
