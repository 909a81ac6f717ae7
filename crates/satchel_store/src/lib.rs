// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core store abstractions for replicated session state.
//!
//! This crate defines the [`SessionStore`] trait that all store backends must
//! satisfy, along with [`StoreProperties`] describing a backend's
//! transactionality and persistence, lifecycle [`StoreEvent`]s with RAII
//! listener [`Registration`]s, and [`Error`] types for fallible operations.
//!
//! # Overview
//!
//! The store abstraction separates replication concerns from session-state
//! logic. A backend implements [`SessionStore`] over whatever replicated
//! cache it fronts; the `satchel` crate builds granularity-aware session
//! attribute storage on top of this boundary, and `satchel_memory` provides
//! an in-process implementation with an observable passivation tier.
//!
//! # Implementing a store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::{Arc, Mutex};
//!
//! use satchel_store::{Error, ListenerRegistry, Registration, SessionStore, StoreEvent, StoreListener, StoreProperties};
//!
//! struct SimpleStore<K, V> {
//!     data: Mutex<HashMap<K, V>>,
//!     listeners: ListenerRegistry<K, V>,
//! }
//!
//! impl<K, V> SessionStore<K, V> for SimpleStore<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
//!     V: Clone + Send + Sync + 'static,
//! {
//!     async fn get(&self, key: &K) -> Result<Option<V>, Error> {
//!         Ok(self.data.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn insert(&self, key: &K, value: V) -> Result<(), Error> {
//!         self.data.lock().unwrap().insert(key.clone(), value);
//!         Ok(())
//!     }
//!
//!     async fn insert_silent(&self, key: &K, value: V) -> Result<(), Error> {
//!         self.insert(key, value).await
//!     }
//!
//!     async fn remove(&self, key: &K) -> Result<(), Error> {
//!         self.data.lock().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     async fn remove_silent(&self, key: &K) -> Result<(), Error> {
//!         self.remove(key).await
//!     }
//!
//!     async fn evict(&self, key: &K) -> Result<(), Error> {
//!         let value = self.data.lock().unwrap().get(key).cloned();
//!         if let Some(value) = value {
//!             self.listeners.dispatch(StoreEvent::PrePassivate { key: key.clone(), value }).await;
//!             self.data.lock().unwrap().remove(key);
//!         }
//!         Ok(())
//!     }
//!
//!     async fn merge<F>(&self, key: &K, f: F) -> Result<Option<V>, Error>
//!     where
//!         F: FnOnce(Option<V>) -> Option<V> + Send,
//!     {
//!         let mut data = self.data.lock().unwrap();
//!         let next = f(data.get(key).cloned());
//!         match next {
//!             Some(value) => {
//!                 data.insert(key.clone(), value.clone());
//!                 Ok(Some(value))
//!             }
//!             None => {
//!                 data.remove(key);
//!                 Ok(None)
//!             }
//!         }
//!     }
//!
//!     fn properties(&self) -> StoreProperties {
//!         StoreProperties::default()
//!     }
//!
//!     fn register(&self, listener: Arc<dyn StoreListener<K, V>>) -> Registration {
//!         self.listeners.register(listener)
//!     }
//! }
//! ```

pub mod error;
mod event;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use event::{ListenerRegistry, Registration, StoreEvent, StoreListener};
#[doc(inline)]
pub use store::{SessionStore, StoreProperties};
