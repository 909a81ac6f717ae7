// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Session metadata consumed by the attribute factories.

/// The slice of session metadata the attribute layer depends on.
///
/// The session manager owns the full metadata record (creation time, access
/// times, timeouts); the attribute factories only need to know whether the
/// session was created during the current request, which decides the
/// write-back strategy under a transactional store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionMetadata {
    new: bool,
}

impl SessionMetadata {
    /// Metadata for a session created during the current request.
    #[must_use]
    pub fn new_session() -> Self {
        Self { new: true }
    }

    /// Metadata for a session that already existed before this request.
    #[must_use]
    pub fn existing() -> Self {
        Self { new: false }
    }

    /// Returns `true` if the session was created during the current request.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.new
    }
}
