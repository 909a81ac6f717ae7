// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Error types for session attribute operations.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for session attribute operations that return
/// a satchel [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from the session attribute layer.
///
/// Decode failures are normally contained by the factories (a corrupt stored
/// representation is purged and reported as an absent session) and only
/// surface here when raised by a codec directly. Encode failures are fatal
/// for the operation that hit them. Store failures are forwarded untouched;
/// any retry policy belongs to the underlying store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The in-memory attribute state could not be encoded for storage.
    #[error("failed to encode session attribute state: {0}")]
    Encode(#[source] BoxError),

    /// A stored representation could not be decoded.
    #[error("failed to decode stored session attribute state: {0}")]
    Decode(#[source] BoxError),

    /// We are forwarding an error received from the underlying store.
    #[error(transparent)]
    Store(#[from] satchel_store::Error),
}

impl Error {
    /// Creates an encode error wrapping an underlying cause.
    pub fn encode(cause: impl Into<BoxError>) -> Self {
        Self::Encode(cause.into())
    }

    /// Creates a decode error wrapping an underlying cause.
    pub fn decode(cause: impl Into<BoxError>) -> Self {
        Self::Decode(cause.into())
    }

    /// Returns `true` if this error is a decode failure.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
