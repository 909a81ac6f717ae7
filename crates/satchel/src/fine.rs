// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Fine-granularity attribute storage.
//!
//! Each attribute is encoded independently inside the session's attribute
//! entry, and release-time writes express only the per-attribute difference
//! through the store's compute primitive. This keeps replication traffic
//! proportional to what actually changed and lets two nodes update disjoint
//! attributes without clobbering each other.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use satchel_store::{Registration, SessionStore, StoreEvent, StoreListener, StoreProperties};
use tracing::{Level, event};

use crate::eviction::EvictionCascade;
use crate::mutator::{FineMutator, Mutator, PassiveMutator};
use crate::{
    AttributeCodec, AttributeSet, Error, ImmutableSessionAttributes, ImmutableSessionView, KeyGroup, NotifierFactory,
    Result, SessionActivationNotifier, SessionAttributes, SessionAttributesFactory, SessionEntry, SessionId,
    SessionKey, SessionMetadata, SessionValue,
};

/// Stores each of a session's attributes independently.
///
/// The attribute entry springs into existence on the first differential
/// write; a session that never stored an attribute has no entry at all, and
/// loading such a session yields an empty set.
///
/// A session missing even one decodable attribute is considered corrupt as
/// a whole: no partial recovery is attempted, favoring consistency over
/// availability of partial data. Lifecycle dispatch is the one exception,
/// since attributes are independently addressable there.
pub struct FineAttributesFactory<C, S>
where
    C: AttributeCodec,
{
    store: Arc<S>,
    codec: Arc<C>,
    notifiers: NotifierFactory,
    properties: StoreProperties,
    registrations: Mutex<Vec<Registration>>,
}

impl<C, S> FineAttributesFactory<C, S>
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
            registrations.push(store.register(Arc::new(FineDispatch {
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
            // The entry is created lazily; an absent entry is a session with
            // no attributes, not an absent session.
            return Ok(Some(AttributeSet::new()));
        };

        let SessionEntry::Fine(stored) = entry else {
            self.corrupt(id, &key, None, &Error::decode("stored session entry is not a fine attribute map"), purge_on_failure)
                .await;
            return Ok(None);
        };

        let mut attributes = HashMap::with_capacity(stored.len());
        for (name, storable) in &stored {
            match self.codec.decode_value(storable) {
                Ok(value) => {
                    attributes.insert(name.clone(), value);
                }
                Err(error) => {
                    self.corrupt(id, &key, Some(name), &error, purge_on_failure).await;
                    return Ok(None);
                }
            }
        }
        Ok(Some(AttributeSet::from_map(attributes)))
    }

    async fn corrupt(&self, id: &SessionId, key: &SessionKey, attribute: Option<&str>, error: &Error, purge: bool) {
        if purge {
            event!(
                Level::WARN,
                session = %id.masked(),
                attribute = attribute.unwrap_or("<entry>"),
                %error,
                "failed to decode session attribute; purging session"
            );
            if let Err(error) = self.store.remove_silent(key).await {
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
                attribute = attribute.unwrap_or("<entry>"),
                %error,
                "failed to decode session attribute"
            );
        }
    }
}

impl<C, S> SessionAttributesFactory<C::Value> for FineAttributesFactory<C, S>
where
    C: AttributeCodec,
    C::Value: SessionValue,
    S: SessionStore<SessionKey, SessionEntry<C::Storable>> + 'static,
{
    async fn create_value(&self, id: &SessionId) -> Result<AttributeSet<C::Value>> {
        event!(Level::TRACE, session = %id.masked(), "creating fine session attributes");
        // No store write: the entry appears with the first attribute merge.
        Ok(AttributeSet::new())
    }

    async fn find_value(&self, id: &SessionId) -> Result<Option<AttributeSet<C::Value>>> {
        event!(Level::TRACE, session = %id.masked(), "loading fine session attributes");
        self.value(id, true).await
    }

    async fn try_value(&self, id: &SessionId) -> Result<Option<AttributeSet<C::Value>>> {
        self.value(id, false).await
    }

    async fn remove(&self, id: &SessionId) -> Result<()> {
        event!(Level::TRACE, session = %id.masked(), "removing fine session attributes");
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
            let current = attributes.snapshot();
            let mut snapshot = HashMap::with_capacity(current.len());
            for (name, value) in &current {
                snapshot.insert(name.clone(), self.codec.encode_value(value)?);
            }
            Box::new(FineMutator::new(
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

impl<C, S> std::fmt::Debug for FineAttributesFactory<C, S>
where
    C: AttributeCodec,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FineAttributesFactory")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Store-event listener dispatching lifecycle callbacks for fine entries.
struct FineDispatch<C>
where
    C: AttributeCodec,
{
    codec: Arc<C>,
    notifiers: NotifierFactory,
}

impl<C> StoreListener<SessionKey, SessionEntry<C::Storable>> for FineDispatch<C>
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
            let SessionEntry::Fine(stored) = entry else {
                return;
            };

            // Attributes are independently addressable, so each one gets its
            // own notifier scope and a corrupt attribute does not abort
            // notification of its siblings.
            for (name, storable) in &stored {
                let notifier = (self.notifiers)(key.session_id());
                match self.codec.decode_value(storable) {
                    Ok(value) => {
                        if let Some(aware) = value.activation_aware() {
                            if activated {
                                notifier.post_activate(aware);
                            } else {
                                notifier.pre_passivate(aware);
                            }
                        }
                    }
                    Err(error) => {
                        event!(
                            Level::WARN,
                            session = %key.session_id().masked(),
                            attribute = %name,
                            %error,
                            "failed to decode session attribute during lifecycle notification; skipping"
                        );
                    }
                }
            }
        })
    }
}
