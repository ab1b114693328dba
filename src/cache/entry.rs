//! Cache Entry Module
//!
//! The bytes the value cache writes to the store: a tagged envelope telling
//! a loaded value apart from a cached failure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// `{"ok": true, "payload": <json text>}` for a loaded value,
/// `{"ok": false, "payload": <message>}` for a cached failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub ok: bool,
    pub payload: String,
}

impl CacheEntry {
    /// Entry holding the JSON encoding of `value`.
    pub fn success<V: Serialize + ?Sized>(value: &V) -> serde_json::Result<Self> {
        Ok(Self {
            ok: true,
            payload: serde_json::to_string(value)?,
        })
    }

    /// Entry recording a failure message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.ok
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Decodes the payload of a success entry.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.payload)
    }
}
