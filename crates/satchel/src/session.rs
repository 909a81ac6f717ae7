// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Session attribute handles.
//!
//! A [`SessionAttributes`] handle wraps the live attribute set of one
//! session together with the mutator bound to its store entry. The handle
//! is owned exclusively by the request that created it; concurrent mutation
//! of the same session from two requests on the same node must be
//! serialized by the caller, outside this layer.

use std::collections::HashMap;

use crate::{AttributeSet, Mutator, Result, SessionActivationNotifier, SessionId, SessionMetadata, SessionValue};

/// A frozen, read-only copy of a session's attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct ImmutableSessionAttributes<V> {
    attributes: HashMap<String, V>,
}

impl<V> ImmutableSessionAttributes<V> {
    /// Creates a read-only view over the given attributes.
    #[must_use]
    pub fn new(attributes: HashMap<String, V>) -> Self {
        Self { attributes }
    }

    /// Returns the attribute with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.attributes.get(name)
    }

    /// Returns `true` if an attribute with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Returns the attribute names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Returns the attribute values, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.attributes.values()
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if the view holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// An immutable composite view of a session: identity, metadata, and a
/// frozen attribute snapshot.
///
/// This is the session shape handed to activation-listener dispatch for
/// persistent stores, where the callbacks must not observe (or cause)
/// further mutation.
#[derive(Clone, Debug)]
pub struct ImmutableSessionView<V> {
    id: SessionId,
    metadata: SessionMetadata,
    attributes: ImmutableSessionAttributes<V>,
}

impl<V> ImmutableSessionView<V> {
    /// Creates a composite view.
    #[must_use]
    pub fn new(id: SessionId, metadata: SessionMetadata, attributes: ImmutableSessionAttributes<V>) -> Self {
        Self {
            id,
            metadata,
            attributes,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the session metadata.
    #[must_use]
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Returns the frozen attribute snapshot.
    #[must_use]
    pub fn attributes(&self) -> &ImmutableSessionAttributes<V> {
        &self.attributes
    }
}

/// The mutable per-request handle over a session's attributes.
///
/// Created by a factory, used by exactly one request, and released at
/// request end. Releasing asks the bound mutator to compare state and issue
/// at most one store write; on a persistent store it also delivers the
/// pre-passivation callbacks first.
pub struct SessionAttributes<V> {
    id: SessionId,
    attributes: AttributeSet<V>,
    mutator: Box<dyn Mutator>,
    notifier: Option<SessionActivationNotifier<V>>,
}

impl<V: SessionValue> SessionAttributes<V> {
    pub(crate) fn new(
        id: SessionId,
        attributes: AttributeSet<V>,
        mutator: Box<dyn Mutator>,
        notifier: Option<SessionActivationNotifier<V>>,
    ) -> Self {
        // Creating the handle is the activation point for sessions loaded
        // from persistent storage.
        if let Some(notifier) = &notifier {
            notifier.post_activate();
        }

        Self {
            id,
            attributes,
            mutator,
            notifier,
        }
    }

    /// Returns the session this handle belongs to.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the live attribute set.
    #[must_use]
    pub fn attributes(&self) -> &AttributeSet<V> {
        &self.attributes
    }

    /// Releases the handle at request end.
    ///
    /// Delivers pre-passivation callbacks when a notifier is attached, then
    /// asks the mutator to write back if the attribute state changed.
    ///
    /// # Errors
    ///
    /// Returns an error if current state cannot be encoded or the store
    /// write fails; the write is not retried.
    pub async fn release(self) -> Result<()> {
        if let Some(notifier) = &self.notifier {
            notifier.pre_passivate();
        }
        self.mutator.mutate().await
    }
}

impl<V> std::fmt::Debug for SessionAttributes<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAttributes")
            .field("id", &self.id.as_str())
            .field("notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}
