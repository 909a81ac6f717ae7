// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Coarse-granularity attribute storage.
//!
//! The whole attribute set of a session is one opaque store value, written
//! in full whenever the release-time comparison detects any mutation. This
//! trades replication traffic for simplicity: one entry, one write, no
//! partial states.

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use satchel_store::{Registration, SessionStore, StoreEvent, StoreListener, StoreProperties};
use tracing::{Level, event};

use crate::eviction::EvictionCascade;
use crate::mutator::{CoarseMutator, Mutator, PassiveMutator};
use crate::{
    AttributeCodec, AttributeSet, Error, ImmutableSessionAttributes, ImmutableSessionView, KeyGroup, NotifierFactory,
    Result, SessionActivationNotifier, SessionAttributes, SessionAttributesFactory, SessionEntry, SessionId,
    SessionKey, SessionMetadata, SessionValue,
};

/// Stores a session's entire attribute set as a single store entry.
///
/// # Write-back strategy
///
/// * New session under a transactional store: the handle's mutator is
///   passive; the enclosing transaction persists the initial state.
/// * Otherwise: the mutator holds the encoded state captured when the handle
///   was bound and writes the full set once if release-time state differs.
///
/// # Lifecycle dispatch
///
/// * Persistent store: each handle carries an activation notifier over an
///   immutable composite session view; store events are not subscribed.
/// * Non-persistent store: the factory subscribes to store events and
///   dispatches callbacks as the attribute entry passivates and activates.
///
/// In both configurations metadata eviction cascades to the attribute entry.
pub struct CoarseAttributesFactory<C, S>
where
    C: AttributeCodec,
{
    store: Arc<S>,
    codec: Arc<C>,
    notifiers: NotifierFactory,
    properties: StoreProperties,
    registrations: Mutex<Vec<Registration>>,
}

impl<C, S> CoarseAttributesFactory<C, S>
where
    C: AttributeCodec,
    C::Value: SessionValue,
    S: SessionStore<SessionKey, SessionEntry<C::Storable>> + 'static,
{
    /// Creates a factory over the given store and codec.
    ///
    /// Subscribes the cascading-eviction listener, and, when the store is
    /// not persistent, the lifecycle dispatch listener. Both registrations
    /// are released by [`close`](SessionAttributesFactory::close) or drop.
    pub fn new(store: Arc<S>, codec: Arc<C>, notifiers: NotifierFactory) -> Self {
        let properties = store.properties();

        let mut registrations = Vec::with_capacity(2);
        registrations.push(store.register(Arc::new(EvictionCascade::new(Arc::clone(&store)))));
        if !properties.persistent() {
            registrations.push(store.register(Arc::new(CoarseDispatch {
                codec: Arc::clone(&codec),
                notifiers: Arc::clone(&notifiers),
            })));
        }

        Self {
            store,
            codec,
            notifiers,
            properties,
            registrations: Mutex::new(registrations),
        }
    }

    async fn value(&self, id: &SessionId, purge_on_failure: bool) -> Result<Option<AttributeSet<C::Value>>> {
        let key = SessionKey::attributes(id.clone());
        let Some(entry) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let decoded = match entry {
            SessionEntry::Coarse(storable) => self.codec.decode_set(&storable),
            SessionEntry::Metadata(_) | SessionEntry::Fine(_) => {
                Err(Error::decode("stored session entry is not a coarse attribute set"))
            }
        };

        match decoded {
            Ok(attributes) => Ok(Some(AttributeSet::from_map(attributes))),
            Err(error) => {
                if purge_on_failure {
                    event!(
                        Level::WARN,
                        session = %id.masked(),
                        %error,
                        "failed to decode session attributes; purging session"
                    );
                    if let Err(error) = self.store.remove_silent(&key).await {
                        event!(
                            Level::DEBUG,
                            session = %id.masked(),
                            %error,
                            "best-effort purge of corrupt session attributes failed"
                        );
                    }
                } else {
                    event!(
                        Level::DEBUG,
                        session = %id.masked(),
                        %error,
                        "failed to decode session attributes"
                    );
                }
                Ok(None)
            }
        }
    }
}

impl<C, S> SessionAttributesFactory<C::Value> for CoarseAttributesFactory<C, S>
where
    C: AttributeCodec,
    C::Value: SessionValue,
    S: SessionStore<SessionKey, SessionEntry<C::Storable>> + 'static,
{
    async fn create_value(&self, id: &SessionId) -> Result<AttributeSet<C::Value>> {
        event!(Level::TRACE, session = %id.masked(), "creating coarse session attributes");
        let attributes = AttributeSet::new();
        let encoded = self.codec.encode_set(&attributes.snapshot())?;
        self.store
            .insert(&SessionKey::attributes(id.clone()), SessionEntry::Coarse(encoded))
            .await?;
        Ok(attributes)
    }

    async fn find_value(&self, id: &SessionId) -> Result<Option<AttributeSet<C::Value>>> {
        event!(Level::TRACE, session = %id.masked(), "loading coarse session attributes");
        self.value(id, true).await
    }

    async fn try_value(&self, id: &SessionId) -> Result<Option<AttributeSet<C::Value>>> {
        self.value(id, false).await
    }

    async fn remove(&self, id: &SessionId) -> Result<()> {
        event!(Level::TRACE, session = %id.masked(), "removing coarse session attributes");
        self.store.remove(&SessionKey::attributes(id.clone())).await?;
        Ok(())
    }

    async fn purge(&self, id: &SessionId) -> Result<()> {
        self.store.remove_silent(&SessionKey::attributes(id.clone())).await?;
        Ok(())
    }

    fn create_session_attributes(
        &self,
        id: &SessionId,
        attributes: AttributeSet<C::Value>,
        metadata: &SessionMetadata,
    ) -> Result<SessionAttributes<C::Value>> {
        let mutator: Box<dyn Mutator> = if self.properties.transactional() && metadata.is_new() {
            Box::new(PassiveMutator)
        } else {
            let snapshot = self.codec.encode_set(&attributes.snapshot())?;
            Box::new(CoarseMutator::new(
                Arc::clone(&self.store),
                Arc::clone(&self.codec),
                SessionKey::attributes(id.clone()),
                attributes.clone(),
                snapshot,
            ))
        };

        let notifier = if self.properties.persistent() {
            let view = ImmutableSessionView::new(
                id.clone(),
                metadata.clone(),
                self.create_immutable_session_attributes(id, &attributes),
            );
            Some(SessionActivationNotifier::new(view, Arc::clone(&self.notifiers)))
        } else {
            None
        };

        Ok(SessionAttributes::new(id.clone(), attributes, mutator, notifier))
    }

    fn create_immutable_session_attributes(
        &self,
        _id: &SessionId,
        attributes: &AttributeSet<C::Value>,
    ) -> ImmutableSessionAttributes<C::Value> {
        ImmutableSessionAttributes::new(attributes.snapshot())
    }

    fn close(&self) {
        self.registrations.lock().clear();
    }
}

impl<C, S> std::fmt::Debug for CoarseAttributesFactory<C, S>
where
    C: AttributeCodec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoarseAttributesFactory")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Store-event listener dispatching lifecycle callbacks for coarse entries.
struct CoarseDispatch<C>
where
    C: AttributeCodec,
{
    codec: Arc<C>,
    notifiers: NotifierFactory,
}

impl<C> StoreListener<SessionKey, SessionEntry<C::Storable>> for CoarseDispatch<C>
where
    C: AttributeCodec,
    C::Value: SessionValue,
{
    fn handle(&self, event: StoreEvent<SessionKey, SessionEntry<C::Storable>>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let (key, entry, activated) = match event {
                StoreEvent::PrePassivate { key, value } => (key, value, false),
                StoreEvent::PostActivate { key, value } => (key, value, true),
            };
            if key.group() != KeyGroup::Attributes {
                return;
            }
            let SessionEntry::Coarse(storable) = entry else {
                return;
            };

            // One notifier scope per dispatch; it also covers the decode and
            // closes on every path out of this block.
            let notifier = (self.notifiers)(key.session_id());
            match self.codec.decode_set(&storable) {
                Ok(attributes) => {
                    for value in attributes.values() {
                        if let Some(aware) = value.activation_aware() {
                            if activated {
                                notifier.post_activate(aware);
                            } else {
                                notifier.pre_passivate(aware);
                            }
                        }
                    }
                }
                Err(error) => {
                    // Purging from inside event delivery would be unsafe, so
                    // the corrupt entry is only reported here.
                    event!(
                        Level::WARN,
                        session = %key.session_id().masked(),
                        %error,
                        "failed to decode session attributes during lifecycle notification"
                    );
                }
            }
        })
    }
}
