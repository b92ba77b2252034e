//! Payload codec for queue messages.
//!
//! The queue carries a uniform byte stream holding two distinct shapes: a
//! directly serialized message, or a small overflow reference pointing at
//! the blob hosting the real payload. Every payload starts with a single
//! discriminator byte so the two shapes decode unambiguously even for
//! permissive message types (any JSON document would decode into
//! `serde_json::Value`, so shape alone cannot be trusted). The tag byte is
//! part of the serialized form everywhere, including overflow blob
//! contents.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tag byte prefixing a directly serialized message
const DIRECT_TAG: u8 = 0x00;

/// Tag byte prefixing a serialized overflow reference
const REFERENCE_TAG: u8 = 0x01;

/// Location of an overflowed payload in the blob store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowReference {
    /// Container hosting the payload
    pub container: String,

    /// Blob name, `<expiration-date>/<queue-name>/<uuid>`
    pub blob_name: String,
}

/// A decoded queue payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// The message itself travelled on the queue
    Direct(T),

    /// The queue carried a reference; the message lives in the blob store
    Overflow(OverflowReference),
}

/// Errors during payload encoding and decoding
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Payload is empty")]
    Empty,

    #[error("Unknown payload tag {0:#04x}")]
    UnknownTag(u8),

    #[error("Payload encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Payload decoding failed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Expected a message payload, found an overflow reference")]
    UnexpectedReference,
}

/// JSON-based payload codec with tag-byte shape discrimination
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer;

impl Serializer {
    /// Create new serializer
    pub fn new() -> Self {
        Self
    }

    /// Serialize a message into a tagged payload
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Bytes, PayloadError> {
        let json = serde_json::to_vec(value).map_err(PayloadError::Encode)?;
        Ok(Self::tagged(DIRECT_TAG, json))
    }

    /// Serialize an overflow reference into a tagged payload
    pub fn serialize_reference(
        &self,
        reference: &OverflowReference,
    ) -> Result<Bytes, PayloadError> {
        let json = serde_json::to_vec(reference).map_err(PayloadError::Encode)?;
        Ok(Self::tagged(REFERENCE_TAG, json))
    }

    /// Decode a payload into either a message or an overflow reference
    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Payload<T>, PayloadError> {
        let (tag, body) = bytes.split_first().ok_or(PayloadError::Empty)?;
        match *tag {
            DIRECT_TAG => {
                let value = serde_json::from_slice(body).map_err(PayloadError::Decode)?;
                Ok(Payload::Direct(value))
            }
            REFERENCE_TAG => {
                let reference = serde_json::from_slice(body).map_err(PayloadError::Decode)?;
                Ok(Payload::Overflow(reference))
            }
            other => Err(PayloadError::UnknownTag(other)),
        }
    }

    /// Decode a payload that must be a direct message (blob contents)
    pub fn deserialize_value<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, PayloadError> {
        match self.deserialize(bytes)? {
            Payload::Direct(value) => Ok(value),
            Payload::Overflow(_) => Err(PayloadError::UnexpectedReference),
        }
    }

    /// Decode a payload that must be an overflow reference (in-flight
    /// wrapper bytes)
    pub fn deserialize_reference(&self, bytes: &[u8]) -> Result<OverflowReference, PayloadError> {
        let (tag, body) = bytes.split_first().ok_or(PayloadError::Empty)?;
        match *tag {
            REFERENCE_TAG => serde_json::from_slice(body).map_err(PayloadError::Decode),
            DIRECT_TAG => Err(PayloadError::UnexpectedReference),
            other => Err(PayloadError::UnknownTag(other)),
        }
    }

    fn tagged(tag: u8, json: Vec<u8>) -> Bytes {
        let mut buf = Vec::with_capacity(json.len() + 1);
        buf.push(tag);
        buf.extend_from_slice(&json);
        Bytes::from(buf)
    }
}

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;
