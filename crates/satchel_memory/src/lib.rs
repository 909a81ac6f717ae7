// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process session store with an observable passivation tier.
//!
//! [`MemoryStore`] implements the `satchel_store` boundary over a concurrent
//! in-memory cache. Explicit eviction moves entries to a passivation tier
//! and a later read moves them back, raising the same lifecycle events a
//! replicated backend with a cache store would, so the session layer's
//! activation and passivation behavior can run without a cluster.
//!
//! # Examples
//!
//! ```
//! use satchel_memory::MemoryStore;
//! use satchel_store::SessionStore;
//! # futures::executor::block_on(async {
//!
//! let store = MemoryStore::<String, String>::builder()
//!     .transactional(false)
//!     .persistent(false)
//!     .build();
//!
//! store.insert(&"id".to_string(), "state".to_string()).await?;
//! store.evict(&"id".to_string()).await?;
//! assert!(store.is_passivated(&"id".to_string()));
//!
//! // Reading activates the entry again.
//! assert!(store.get(&"id".to_string()).await?.is_some());
//! # Ok::<(), satchel_store::Error>(())
//! # });
//! ```

mod builder;
mod store;

#[doc(inline)]
pub use builder::MemoryStoreBuilder;
#[doc(inline)]
pub use store::MemoryStore;
