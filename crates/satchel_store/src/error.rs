// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Error types for store operations.

use thiserror::Error;

/// A specialized [`Result`] type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from a replicated store operation.
///
/// Store backends differ widely in how calls can fail (network partitions,
/// replication timeouts, transaction aborts), so this type is deliberately
/// opaque. Use [`std::error::Error::source()`] to access the underlying cause
/// if needed.
///
/// # Example
///
/// ```
/// use satchel_store::Error;
///
/// let error = Error::from_message("replication timed out");
/// assert!(error.to_string().contains("timed out"));
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The store reported a failure described only by a message.
    #[error("{0}")]
    Message(String),

    /// We are forwarding an error of unknown type from the store backend.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates a new error from anything that can be rendered as a message.
    ///
    /// This is the public API for creating store errors from backend crates.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Creates a new error wrapping an underlying cause.
    pub fn from_source(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(cause))
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Error: Send, Sync);
    }

    #[test]
    fn message_is_displayed() {
        let error = Error::from_message("store unavailable");
        assert_eq!(error.to_string(), "store unavailable");
    }

    #[test]
    fn source_is_preserved() {
        let cause = std::io::Error::other("connection reset");
        let error = Error::from_source(cause);
        assert!(std::error::Error::source(&error).is_some());
    }
}
