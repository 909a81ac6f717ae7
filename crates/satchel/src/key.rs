// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Cache key types addressing a session's entries in the store.
//!
//! A session owns two logical entries: its metadata entry and its attribute
//! entry. Both are addressed by a [`SessionKey`], which combines the
//! [`SessionId`] with a [`KeyGroup`] discriminator. Keys are constructed on
//! every access and never persisted separately; the key IS the store address.

use std::fmt;

/// An opaque, externally generated session identifier.
///
/// Unique per session and immutable for the session's lifetime. Session ids
/// are sensitive (they are bearer tokens for the session), so log output
/// should go through [`SessionId::masked`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session id from its external string form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the full identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a display adapter that masks the middle of the identifier.
    ///
    /// Identifiers longer than eight characters render as the first two and
    /// last six characters around a `****` filler; shorter ones render in
    /// full.
    #[must_use]
    pub fn masked(&self) -> MaskedId<'_> {
        MaskedId(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Masked display adapter for a [`SessionId`], suitable for log output.
#[derive(Clone, Copy, Debug)]
pub struct MaskedId<'a>(&'a str);

impl fmt::Display for MaskedId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.chars().count();
        if count <= 8 {
            return f.write_str(self.0);
        }

        for c in self.0.chars().take(2) {
            write!(f, "{c}")?;
        }
        f.write_str("****")?;
        for c in self.0.chars().skip(count - 6) {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Discriminates the store entries belonging to one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyGroup {
    /// The session's metadata entry, owned by the session manager.
    Metadata,
    /// The session's attribute entry, owned by an attributes factory.
    Attributes,
}

/// The store address of one of a session's entries.
///
/// Two keys with equal session id and group denote the same logical entry
/// regardless of attribute granularity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    id: SessionId,
    group: KeyGroup,
}

impl SessionKey {
    /// Creates the key of a session's metadata entry.
    #[must_use]
    pub fn metadata(id: SessionId) -> Self {
        Self {
            id,
            group: KeyGroup::Metadata,
        }
    }

    /// Creates the key of a session's attribute entry.
    #[must_use]
    pub fn attributes(id: SessionId) -> Self {
        Self {
            id,
            group: KeyGroup::Attributes,
        }
    }

    /// Returns the session this key belongs to.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    /// Returns which of the session's entries this key addresses.
    #[must_use]
    pub fn group(&self) -> KeyGroup {
        self.group
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group {
            KeyGroup::Metadata => write!(f, "{}#metadata", self.id),
            KeyGroup::Attributes => write!(f, "{}#attributes", self.id),
        }
    }
}
