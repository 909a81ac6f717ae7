// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! Replicated, granularity-aware storage of session attribute sets.
//!
//! A session manager asks a [`SessionAttributesFactory`] to create, find, or
//! destroy the attribute set for a session ID. The factory addresses the
//! underlying replicated store with a key derived from the ID, marshals
//! state through an [`AttributeCodec`], and returns a live
//! [`SessionAttributes`] handle bound to a mutation tracker. Application
//! code mutates the in-memory set through that handle; releasing the handle
//! writes back only if required.
//!
//! # Granularity
//!
//! * [`CoarseAttributesFactory`] stores the whole attribute set as one store
//!   value and rewrites it in full on any detected mutation.
//! * [`FineAttributesFactory`] tracks each attribute independently and
//!   expresses release-time changes as a single differential merge, so two
//!   nodes updating disjoint attributes do not clobber each other.
//!
//! # Write elision
//!
//! Releasing a handle issues at most one store write, and none when the
//! attribute state is unchanged. A new session under a transactional store
//! issues no release-time write at all: the enclosing transaction already
//! persists the initial state.
//!
//! # Passivation and activation
//!
//! Attribute values advertising the [`ActivationAware`] capability receive
//! callbacks exactly once per transition. On a non-persistent store the
//! factories subscribe to store lifecycle events; on a persistent store each
//! handle carries a notifier over an immutable composite session view.
//! Evicting a session's metadata entry always cascades to its attribute
//! entry, never the reverse.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use satchel::{
//!     CoarseAttributesFactory, JsonCodec, MemoryStore, SessionAttributesFactory, SessionEntry,
//!     SessionId, SessionKey, SessionMetadata, direct_notifiers,
//! };
//! # futures::executor::block_on(async {
//!
//! let store = Arc::new(MemoryStore::<SessionKey, SessionEntry<serde_json::Value>>::new());
//! let codec = Arc::new(JsonCodec::<i64>::new());
//! let factory = CoarseAttributesFactory::new(store, codec, direct_notifiers());
//!
//! let id = SessionId::new("la4Gsn41XealfIRZrlKWbXVMu6BE9y7C");
//! let attributes = factory.create_value(&id).await?;
//!
//! let handle = factory.create_session_attributes(&id, attributes, &SessionMetadata::existing())?;
//! handle.attributes().insert("count", 1);
//! handle.release().await?;
//!
//! let attributes = factory.find_value(&id).await?.expect("session present");
//! assert_eq!(attributes.get("count"), Some(1));
//! # Ok::<(), satchel::Error>(())
//! # });
//! ```

mod codec;
mod entry;
pub mod error;
mod eviction;
mod factory;
mod key;
mod metadata;
mod mutator;
mod notifier;
mod session;
mod set;
mod value;

pub mod coarse;
pub mod fine;

#[doc(inline)]
pub use coarse::CoarseAttributesFactory;
#[doc(inline)]
pub use codec::AttributeCodec;
#[cfg(feature = "json")]
#[doc(inline)]
pub use codec::JsonCodec;
#[doc(inline)]
pub use entry::SessionEntry;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use factory::SessionAttributesFactory;
#[doc(inline)]
pub use fine::FineAttributesFactory;
#[doc(inline)]
pub use key::{KeyGroup, MaskedId, SessionId, SessionKey};
#[doc(inline)]
pub use metadata::SessionMetadata;
#[doc(inline)]
pub use mutator::{Mutator, PassiveMutator};
#[doc(inline)]
pub use notifier::{ActivationNotifier, DirectNotifier, NotifierFactory, SessionActivationNotifier, direct_notifiers};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use satchel_memory::MemoryStore;
#[doc(inline)]
pub use session::{ImmutableSessionAttributes, ImmutableSessionView, SessionAttributes};
#[doc(inline)]
pub use set::AttributeSet;
#[doc(inline)]
pub use value::{ActivationAware, SessionValue};
