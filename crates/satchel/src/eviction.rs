// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Cascading eviction of attribute entries.

use std::sync::Arc;

use futures::future::BoxFuture;
use satchel_store::{SessionStore, StoreEvent, StoreListener};
use tracing::{Level, event};

use crate::{KeyGroup, SessionEntry, SessionKey};

/// Couples the attribute entry's residency to the metadata entry's.
///
/// When the session manager's metadata entry is passivated, this listener
/// evicts the corresponding attribute entry. The coupling is one-way:
/// metadata eviction always implies attribute eviction, while attribute
/// writes and evictions never touch the metadata entry.
pub(crate) struct EvictionCascade<S> {
    store: Arc<S>,
}

impl<S> EvictionCascade<S> {
    pub(crate) fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S, M> StoreListener<SessionKey, SessionEntry<M>> for EvictionCascade<S>
where
    S: SessionStore<SessionKey, SessionEntry<M>> + 'static,
    M: Clone + Send + Sync + 'static,
{
    fn handle(&self, event: StoreEvent<SessionKey, SessionEntry<M>>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let StoreEvent::PrePassivate { key, .. } = event else {
                return;
            };
            if key.group() != KeyGroup::Metadata {
                return;
            }

            let attributes = SessionKey::attributes(key.session_id().clone());
            if let Err(error) = self.store.evict(&attributes).await {
                event!(
                    Level::WARN,
                    session = %key.session_id().masked(),
                    %error,
                    "failed to cascade metadata eviction to session attributes"
                );
            }
        })
    }
}
