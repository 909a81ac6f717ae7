// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Builder for configuring in-process stores.
//!
//! This module provides a builder API for `MemoryStore` that abstracts the
//! underlying moka configuration, providing a stable API surface without
//! exposing moka's types.

use std::hash::Hash;
use std::marker::PhantomData;

use satchel_store::StoreProperties;

use crate::store::MemoryStore;

/// Builder for configuring a `MemoryStore`.
///
/// The declared [`StoreProperties`] describe the backend a deployment would
/// stand this store in for; they drive the session layer's write-back and
/// notification strategy but do not change the store's local mechanics.
///
/// # Examples
///
/// ```
/// use satchel_memory::MemoryStore;
///
/// let store = MemoryStore::<String, i32>::builder()
///     .transactional(true)
///     .persistent(false)
///     .name("session-store")
///     .build();
/// ```
#[derive(Debug)]
pub struct MemoryStoreBuilder<K, V> {
    pub(crate) transactional: bool,
    pub(crate) persistent: bool,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> Default for MemoryStoreBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryStoreBuilder<K, V> {
    /// Creates a new builder with default settings.
    ///
    /// The default store is non-transactional and non-persistent.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transactional: false,
            persistent: false,
            initial_capacity: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Declares whether writes participate in an enclosing transaction.
    #[must_use]
    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// Declares whether the store stands in for durable shared storage.
    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Sets the initial capacity (pre-allocation hint) for the hot tier.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a name for the store.
    ///
    /// The name may appear in debugging output from the underlying cache
    /// implementation.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the properties the built store will report.
    #[must_use]
    pub fn properties(&self) -> StoreProperties {
        StoreProperties::new(self.transactional, self.persistent)
    }

    /// Builds the configured `MemoryStore`.
    #[must_use]
    pub fn build(self) -> MemoryStore<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        MemoryStore::from_builder(&self)
    }
}
