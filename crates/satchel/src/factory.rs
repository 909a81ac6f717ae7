// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! The contract between the session manager and an attributes factory.

use crate::{AttributeSet, ImmutableSessionAttributes, Result, SessionAttributes, SessionId, SessionMetadata};

/// Creates, locates, and destroys the attribute set for a session.
///
/// Implementations differ in storage granularity, not in contract:
/// [`CoarseAttributesFactory`](crate::CoarseAttributesFactory) stores the
/// whole set as one value, while
/// [`FineAttributesFactory`](crate::FineAttributesFactory) tracks each
/// attribute independently. `V` is the application-facing value type.
pub trait SessionAttributesFactory<V>: Send + Sync {
    /// Allocates the attribute set for a newly created session.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding the initial state or the store write
    /// fails.
    fn create_value(&self, id: &SessionId) -> impl Future<Output = Result<AttributeSet<V>>> + Send;

    /// Loads the attribute set for a session.
    ///
    /// Returns `None` if the session's attributes are absent or corrupt; a
    /// corrupt stored representation is purged so the caller can re-create
    /// the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn find_value(&self, id: &SessionId) -> impl Future<Output = Result<Option<AttributeSet<V>>>> + Send;

    /// Peeks at the attribute set for a session.
    ///
    /// Like [`find_value`](Self::find_value), but a corrupt stored
    /// representation is left in place. Used where purging would be unsafe,
    /// such as during lifecycle event delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn try_value(&self, id: &SessionId) -> impl Future<Output = Result<Option<AttributeSet<V>>>> + Send;

    /// Removes the session's attribute entry, replicating the removal.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn remove(&self, id: &SessionId) -> impl Future<Output = Result<()>> + Send;

    /// Removes the session's attribute entry without cross-node
    /// notification, as best-effort cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store call fails.
    fn purge(&self, id: &SessionId) -> impl Future<Output = Result<()>> + Send;

    /// Builds the mutable per-request handle for a session.
    ///
    /// The bound mutator and the optional activation notifier depend on the
    /// store's properties and on whether the session is new; see the crate
    /// documentation for the exact rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the pristine snapshot cannot be encoded.
    fn create_session_attributes(
        &self,
        id: &SessionId,
        attributes: AttributeSet<V>,
        metadata: &SessionMetadata,
    ) -> Result<SessionAttributes<V>>;

    /// Builds a frozen, read-only view of a session's attributes.
    fn create_immutable_session_attributes(
        &self,
        id: &SessionId,
        attributes: &AttributeSet<V>,
    ) -> ImmutableSessionAttributes<V>;

    /// Releases every listener registration this factory holds.
    ///
    /// Called at factory shutdown; dropping the factory has the same effect.
    fn close(&self);
}
