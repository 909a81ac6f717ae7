// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! The core trait for replicated session store backends.
//!
//! [`SessionStore`] defines the interface that all store backends must
//! implement. The trait models the handful of access modes a replicated
//! cache exposes: plain reads, write-only writes (no prior read), silent
//! writes (no cross-node notification), logical removal, tier eviction, and
//! a compute-style merge for differential updates.

use std::sync::Arc;

use crate::{Error, Registration, StoreListener};

/// Static characteristics of a store backend.
///
/// The session layer branches on these to pick a write-back strategy: a
/// transactional store persists the initial state of a new session through
/// its enclosing transaction, and a persistent store makes activation from
/// durable storage an observable event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreProperties {
    transactional: bool,
    persistent: bool,
}

impl StoreProperties {
    /// Creates a property set.
    #[must_use]
    pub fn new(transactional: bool, persistent: bool) -> Self {
        Self {
            transactional,
            persistent,
        }
    }

    /// Returns `true` if store writes participate in an enclosing transaction.
    #[must_use]
    pub fn transactional(&self) -> bool {
        self.transactional
    }

    /// Returns `true` if the store is backed by durable shared storage.
    #[must_use]
    pub fn persistent(&self) -> bool {
        self.persistent
    }
}

/// Trait for replicated session store implementations.
///
/// All operations may block on network or replication latency; none are
/// guaranteed non-blocking. Implementations must be safe to call from many
/// tasks concurrently, and must not hold internal locks across listener
/// dispatch (listeners may re-enter the store).
///
/// # Access modes
///
/// * [`insert`](Self::insert) writes without reading the previous value and
///   replicates to other nodes.
/// * [`insert_silent`](Self::insert_silent) and
///   [`remove_silent`](Self::remove_silent) skip cross-node notification;
///   they exist for best-effort local cleanup.
/// * [`evict`](Self::evict) pushes an entry out of the primary tier without
///   removing it logically, raising a
///   [`PrePassivate`](crate::StoreEvent::PrePassivate) event first.
/// * [`merge`](Self::merge) applies a closure to the current value
///   atomically, avoiding a separate read-modify-write round trip.
pub trait SessionStore<K, V>: Send + Sync {
    /// Reads the entry for a key, activating it if it was passivated.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Writes an entry unconditionally, without reading the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn insert(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send;

    /// Writes an entry without notifying other nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn insert_silent(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes an entry, replicating the removal.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn remove(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes an entry without notifying other nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn remove_silent(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Evicts an entry from the primary tier.
    ///
    /// Raises [`PrePassivate`](crate::StoreEvent::PrePassivate) for the entry
    /// before it leaves the tier. Evicting an absent entry is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn evict(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Atomically transforms the entry for a key.
    ///
    /// The closure receives the current value (`None` if absent) and returns
    /// the value to store; returning `None` removes the entry. The transform
    /// is applied under the store's own concurrency control, so two nodes
    /// merging disjoint changes do not clobber each other.
    ///
    /// Returns the value now stored for the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn merge<F>(&self, key: &K, f: F) -> impl Future<Output = Result<Option<V>, Error>> + Send
    where
        F: FnOnce(Option<V>) -> Option<V> + Send;

    /// Returns the static characteristics of this store.
    fn properties(&self) -> StoreProperties;

    /// Subscribes a listener to this store's lifecycle events.
    ///
    /// The listener stays registered until the returned [`Registration`] is
    /// dropped or closed.
    fn register(&self, listener: Arc<dyn StoreListener<K, V>>) -> Registration;
}
