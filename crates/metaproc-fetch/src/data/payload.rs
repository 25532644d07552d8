use bytes::Bytes;
use serde_json::Value;

/// Decoded response body.
///
/// Bodies that parse as JSON are manifests; anything else is an opaque
/// binary asset.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Binary,
}

/// A completed download.
///
/// The raw bytes are always kept so that JSON-encoded assets (a `.gltf`
/// scene, say) can still be handed to a binary-format decoder.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: Payload,
    pub bytes: Bytes,
}

impl Fetched {
    pub fn from_body(bytes: Bytes) -> Self {
        let payload = match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Binary,
        };
        Self { payload, bytes }
    }

    /// Body length in bytes.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_json(&self) -> bool {
        matches!(self.payload, Payload::Json(_))
    }

    pub fn into_json(self) -> Option<Value> {
        match self.payload {
            Payload::Json(value) => Some(value),
            Payload::Binary => None,
        }
    }
}
