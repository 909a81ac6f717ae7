// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! The store-side representation of a session's entries.

use std::collections::HashMap;

use crate::SessionMetadata;

/// A value stored under a [`SessionKey`](crate::SessionKey).
///
/// One store holds all of a session's entries, discriminated by key group
/// and by this enum. The metadata entry is written by the session manager;
/// the attribute entry is written by exactly one of the two factories,
/// depending on the configured granularity. A factory that reads an
/// unexpected variant treats it as a decode failure.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEntry<M> {
    /// The session's metadata record.
    Metadata(SessionMetadata),
    /// The whole attribute set encoded as one opaque value.
    Coarse(M),
    /// Each attribute encoded independently, updated by differential merge.
    Fine(HashMap<String, M>),
}
