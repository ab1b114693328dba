//! Error types for the value cache and trace propagation
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

/// Boxed error returned by loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// == Store Error Enum ==
/// Errors surfaced by a backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key not found in the store. Only the cache looks at this one: it is the
    /// trigger for loading, never handed to callers as its own condition.
    #[error("store: nil")]
    Nil,

    /// The request context was cancelled before the store call ran
    #[error("context cancelled")]
    Cancelled,

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Store is full and eviction failed
    #[error("Store full: {0}")]
    CacheFull(String),

    /// Internal store error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Cache Error Enum ==
/// Errors returned by [`ValueCache`](crate::cache::ValueCache) operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key kind cannot be turned into a canonical store key
    #[error("key err: unsupported type {0}")]
    InvalidKeyKind(String),

    /// No store instance is registered for the namespace
    #[error("get instance err, namespace: {namespace}")]
    StoreUnavailable { namespace: String },

    /// Store failure other than a miss
    #[error("{op} cache key: {key} err: {source}")]
    StoreAccess {
        op: &'static str,
        key: String,
        #[source]
        source: StoreError,
    },

    /// Loader failed; the failure has been cached
    #[error("load cache key: {key} err: {source}")]
    Load {
        key: String,
        #[source]
        source: BoxError,
    },

    /// A cached loader failure was read back
    #[error("cached failure for key: {key}: {message}")]
    NegativeHit { key: String, message: String },

    /// Loaded value could not be JSON encoded
    #[error("marshal cache key: {key} err: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Cached bytes could not be JSON decoded
    #[error("unmarshal cache key: {key} err: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

// == Trace Error Enum ==
/// Failures while reading tracing data from a context or carrier.
///
/// None of these are fatal: extraction falls back to placeholders and
/// payload decoding falls back to a root span.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("traceID not found")]
    TraceIdNotFound,

    #[error("valid context head not found")]
    HeadNotFound,

    #[error("span context not found in carrier")]
    SpanContextNotFound,
}

// == Payload Error Enum ==
/// Errors building or reading a message envelope.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode payload: {0}")]
    Decode(#[source] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_access_message_names_op_and_key() {
        let err = CacheError::StoreAccess {
            op: "Cache.Get",
            key: "ord.42".to_string(),
            source: StoreError::Internal("boom".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("Cache.Get"));
        assert!(msg.contains("ord.42"));
        assert!(msg.contains("boom"));
    }
}
