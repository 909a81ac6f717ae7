// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! The marshalling boundary between attribute values and the store.
//!
//! A codec converts application values to the store's storable
//! representation and back. Coarse granularity marshals the whole
//! name-to-value mapping as one storable; fine granularity marshals each
//! value on its own. Production deployments supply a codec matching their
//! wire format; [`JsonCodec`] is the stock implementation for
//! serde-compatible value types.

use std::collections::HashMap;

use crate::{Error, Result};

/// Converts attribute state to and from a storable representation.
///
/// `Storable` must support equality comparison: the mutation trackers
/// compare freshly encoded state against a snapshot captured at bind time to
/// elide redundant writes.
pub trait AttributeCodec: Send + Sync + 'static {
    /// The application-facing attribute value type.
    type Value: Clone + Send + Sync + 'static;

    /// The representation the store persists and replicates.
    type Storable: Clone + PartialEq + Send + Sync + 'static;

    /// Encodes a single attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if the value cannot be marshalled; the
    /// caller treats this as fatal for the surrounding operation.
    fn encode_value(&self, value: &Self::Value) -> Result<Self::Storable>;

    /// Decodes a single attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the stored representation is corrupt or
    /// incompatible.
    fn decode_value(&self, storable: &Self::Storable) -> Result<Self::Value>;

    /// Encodes a whole attribute set as one storable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if any value cannot be marshalled.
    fn encode_set(&self, attributes: &HashMap<String, Self::Value>) -> Result<Self::Storable>;

    /// Decodes a whole attribute set from one storable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the stored representation is corrupt or
    /// incompatible.
    fn decode_set(&self, storable: &Self::Storable) -> Result<HashMap<String, Self::Value>>;
}

/// A codec for serde-compatible value types, storing JSON values.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use satchel::{AttributeCodec, JsonCodec};
///
/// let codec = JsonCodec::<i32>::new();
///
/// let mut attributes = HashMap::new();
/// attributes.insert("count".to_string(), 1);
///
/// let stored = codec.encode_set(&attributes)?;
/// assert_eq!(codec.decode_set(&stored)?, attributes);
/// # Ok::<(), satchel::Error>(())
/// ```
#[cfg(feature = "json")]
pub struct JsonCodec<V> {
    _phantom: std::marker::PhantomData<fn() -> V>,
}

#[cfg(feature = "json")]
impl<V> JsonCodec<V> {
    /// Creates a new JSON codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "json")]
impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "json")]
impl<V> Clone for JsonCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[cfg(feature = "json")]
impl<V> std::fmt::Debug for JsonCodec<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

#[cfg(feature = "json")]
impl<V> AttributeCodec for JsonCodec<V>
where
    V: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Value = V;
    type Storable = serde_json::Value;

    fn encode_value(&self, value: &Self::Value) -> Result<Self::Storable> {
        serde_json::to_value(value).map_err(Error::encode)
    }

    fn decode_value(&self, storable: &Self::Storable) -> Result<Self::Value> {
        serde_json::from_value(storable.clone()).map_err(Error::decode)
    }

    fn encode_set(&self, attributes: &HashMap<String, Self::Value>) -> Result<Self::Storable> {
        let mut object = serde_json::Map::with_capacity(attributes.len());
        for (name, value) in attributes {
            object.insert(name.clone(), self.encode_value(value)?);
        }
        Ok(serde_json::Value::Object(object))
    }

    fn decode_set(&self, storable: &Self::Storable) -> Result<HashMap<String, Self::Value>> {
        let serde_json::Value::Object(object) = storable else {
            return Err(Error::decode("stored attribute set is not an object"));
        };

        let mut attributes = HashMap::with_capacity(object.len());
        for (name, value) in object {
            attributes.insert(name.clone(), self.decode_value(value)?);
        }
        Ok(attributes)
    }
}
