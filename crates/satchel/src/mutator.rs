// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Mutation trackers deciding whether a released attribute set needs a write.
//!
//! A mutator is bound to a session's attribute entry when a
//! [`SessionAttributes`](crate::SessionAttributes) handle is created,
//! capturing a pristine snapshot of the encoded state. When the handle is
//! released the mutator compares current state against the snapshot and
//! issues at most one store write. Comparison is always against the
//! snapshot, never a live reference, so in-place mutation cannot produce a
//! false negative.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use satchel_store::SessionStore;

use crate::{AttributeCodec, AttributeSet, Result, SessionEntry, SessionKey};

/// Decides, at release time, whether the in-memory attribute state requires
/// a store write, and issues it at most once.
///
/// A cache write failure is not retried here; retry policy, if any, belongs
/// to the underlying store.
pub trait Mutator: Send + Sync {
    /// Compares state and writes if required.
    ///
    /// Calling this a second time is a no-op: a release cycle issues at most
    /// one write.
    fn mutate(&self) -> BoxFuture<'_, Result<()>>;
}

/// A mutator that never writes.
///
/// Used for a session created under a transactional store: the enclosing
/// transaction already persists the initial state, so the release-time
/// comparison is skipped entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassiveMutator;

impl Mutator for PassiveMutator {
    fn mutate(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Release-time tracker for a coarse attribute entry.
///
/// Holds the encoded form of the set as it looked at bind time; on release
/// the whole set is re-encoded and written in full if anything differs.
pub(crate) struct CoarseMutator<C, S>
where
    C: AttributeCodec,
{
    store: Arc<S>,
    codec: Arc<C>,
    key: SessionKey,
    attributes: AttributeSet<C::Value>,
    snapshot: C::Storable,
    released: AtomicBool,
}

impl<C, S> CoarseMutator<C, S>
where
    C: AttributeCodec,
{
    pub(crate) fn new(
        store: Arc<S>,
        codec: Arc<C>,
        key: SessionKey,
        attributes: AttributeSet<C::Value>,
        snapshot: C::Storable,
    ) -> Self {
        Self {
            store,
            codec,
            key,
            attributes,
            snapshot,
            released: AtomicBool::new(false),
        }
    }
}

impl<C, S> Mutator for CoarseMutator<C, S>
where
    C: AttributeCodec,
    S: SessionStore<SessionKey, SessionEntry<C::Storable>> + 'static,
{
    fn mutate(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.released.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            let current = self.codec.encode_set(&self.attributes.snapshot())?;
            if current == self.snapshot {
                return Ok(());
            }

            self.store.insert(&self.key, SessionEntry::Coarse(current)).await?;
            Ok(())
        })
    }
}

/// Release-time tracker for a fine attribute entry.
///
/// Holds the per-attribute encoded forms captured at bind time; on release
/// the set difference is computed and expressed as a single compute-style
/// merge touching only the changed attributes.
pub(crate) struct FineMutator<C, S>
where
    C: AttributeCodec,
{
    store: Arc<S>,
    codec: Arc<C>,
    key: SessionKey,
    attributes: AttributeSet<C::Value>,
    snapshot: HashMap<String, C::Storable>,
    released: AtomicBool,
}

impl<C, S> FineMutator<C, S>
where
    C: AttributeCodec,
{
    pub(crate) fn new(
        store: Arc<S>,
        codec: Arc<C>,
        key: SessionKey,
        attributes: AttributeSet<C::Value>,
        snapshot: HashMap<String, C::Storable>,
    ) -> Self {
        Self {
            store,
            codec,
            key,
            attributes,
            snapshot,
            released: AtomicBool::new(false),
        }
    }
}

impl<C, S> Mutator for FineMutator<C, S>
where
    C: AttributeCodec,
    S: SessionStore<SessionKey, SessionEntry<C::Storable>> + 'static,
{
    fn mutate(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.released.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            let current = self.attributes.snapshot();

            let mut updates = HashMap::new();
            for (name, value) in &current {
                let encoded = self.codec.encode_value(value)?;
                if self.snapshot.get(name) != Some(&encoded) {
                    updates.insert(name.clone(), encoded);
                }
            }
            let removals: Vec<String> = self
                .snapshot
                .keys()
                .filter(|name| !current.contains_key(*name))
                .cloned()
                .collect();

            if updates.is_empty() && removals.is_empty() {
                return Ok(());
            }

            self.store
                .merge(&self.key, move |entry| {
                    let mut map = match entry {
                        Some(SessionEntry::Fine(map)) => map,
                        // The entry springs into existence on first write; any
                        // other shape is replaced outright by this session's
                        // view of its own attributes.
                        _ => HashMap::new(),
                    };
                    for name in &removals {
                        map.remove(name);
                    }
                    map.extend(updates);
                    if map.is_empty() { None } else { Some(SessionEntry::Fine(map)) }
                })
                .await?;
            Ok(())
        })
    }
}
