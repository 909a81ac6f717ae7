// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! The live, mutable attribute set of an active session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// A thread-safe mapping from attribute name to application value.
///
/// Exactly one `AttributeSet` exists in memory per active session per node;
/// cloning the handle shares the same underlying map. Application code
/// mutates the set through a
/// [`SessionAttributes`](crate::SessionAttributes) handle for the duration
/// of one request, and the handle's mutator decides at release time whether
/// the mutations require a store write.
pub struct AttributeSet<V> {
    inner: Arc<RwLock<HashMap<String, V>>>,
}

impl<V> AttributeSet<V> {
    /// Creates an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates an attribute set holding the given attributes.
    #[must_use]
    pub fn from_map(attributes: HashMap<String, V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(attributes)),
        }
    }

    /// Returns the number of attributes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if the set has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns `true` if an attribute with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Returns the names of all attributes, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Removes the attribute with the given name, returning its value.
    pub fn remove(&self, name: &str) -> Option<V> {
        self.inner.write().remove(name)
    }
}

impl<V: Clone> AttributeSet<V> {
    /// Returns a copy of the attribute with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<V> {
        self.inner.read().get(name).cloned()
    }

    /// Inserts or replaces an attribute, returning the previous value.
    pub fn insert(&self, name: impl Into<String>, value: V) -> Option<V> {
        self.inner.write().insert(name.into(), value)
    }

    /// Returns a point-in-time copy of the whole set.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, V> {
        self.inner.read().clone()
    }
}

impl<V> Default for AttributeSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for AttributeSet<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for AttributeSet<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.inner.read().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let set = AttributeSet::new();
        let alias = set.clone();

        set.insert("count", 1);
        assert_eq!(alias.get("count"), Some(1));

        alias.remove("count");
        assert!(set.is_empty());
    }

    #[test]
    fn snapshot_is_detached() {
        let set = AttributeSet::new();
        set.insert("a", 1);

        let snapshot = set.snapshot();
        set.insert("b", 2);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn insert_returns_previous_value() {
        let set = AttributeSet::new();
        assert_eq!(set.insert("a", 1), None);
        assert_eq!(set.insert("a", 2), Some(1));
    }
}
