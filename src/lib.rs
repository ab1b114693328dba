//! Trace Cache - read-through value caching with trace propagation
//!
//! A negative-caching value cache layered over a key/value store, and the
//! trace context protocol shared by log rendering and message envelopes.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod mq;
pub mod store;
pub mod tasks;
pub mod trace;

pub use cache::{CacheConfig, CacheKey, ValueCache};
pub use config::Config;
pub use context::{Context, RequestHead, RequestHeader};
pub use error::{CacheError, PayloadError, Result, StoreError, TraceError};
pub use mq::{Envelope, Message, PayloadCodec};
pub use store::{InstanceManager, MemoryStore, StaticInstances, Store};
pub use tasks::spawn_cleanup_task;
