//! The serialization boundary.
//!
//! The engine is format-agnostic: it moves opaque bytes between a
//! [`Codec`] and the filesystem.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;
use crate::key::Keys;
use crate::schema::SchemaUri;

/// Turns document content into bytes and back.
pub trait Codec: Send + Sync {
    /// The in-memory content type.
    type Value;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes read through `keys`, expecting a document of `type_hint`.
    fn decode(
        &self,
        bytes: &[u8],
        keys: &Keys,
        type_hint: &SchemaUri,
    ) -> Result<Self::Value, CodecError>;
}

/// JSON codec for any serde type.
pub struct JsonCodec<T> {
    pretty: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            pretty: false,
            _marker: PhantomData,
        }
    }

    /// Emit indented JSON.
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec")
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let out = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        out.map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8], _keys: &Keys, type_hint: &SchemaUri) -> Result<T, CodecError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CodecError::Decode(format!("{type_hint}: {e}")))
    }
}

/// Pass-through codec for callers that serialize themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8], _keys: &Keys, _type_hint: &SchemaUri) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}
