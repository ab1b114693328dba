//! Store Module
//!
//! The backing key/value store protocol the value cache reads through,
//! instance resolution by namespace, and an in-memory implementation with
//! TTL expiration and LRU eviction.

mod entry;
mod lru;
mod memory;
mod stats;


use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::normalize_namespace;
use crate::context::Context;
use crate::error::StoreError;

pub use entry::StoredValue;
pub use lru::LruTracker;
pub use memory::MemoryStore;
pub use stats::StoreStats;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Store ==
/// Key/value store addressed by canonical keys.
///
/// `get` must report a missing key as [`StoreError::Nil`] and nothing else;
/// every other error is treated as a failed access. Implementations should
/// fail with [`StoreError::Cancelled`] once the context is cancelled.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Stores `value` for `ttl`.
    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Deletes `key`; an absent key is not an error.
    async fn del(&self, ctx: &Context, key: &str) -> Result<(), StoreError>;

    /// Short name of the store, recorded on spans.
    fn kind(&self) -> &'static str {
        "store"
    }
}

// == Instance Manager ==
/// Resolves the store instance serving a namespace.
pub trait InstanceManager: Send + Sync {
    fn get_instance(&self, namespace: &str) -> Option<Arc<dyn Store>>;
}

/// A fixed namespace → store table, built once at startup.
#[derive(Clone, Default)]
pub struct StaticInstances {
    instances: HashMap<String, Arc<dyn Store>>,
}

impl StaticInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `store` for `namespace` (`/` is normalized to `.`).
    pub fn with_instance(mut self, namespace: &str, store: Arc<dyn Store>) -> Self {
        self.register(namespace, store);
        self
    }

    pub fn register(&mut self, namespace: &str, store: Arc<dyn Store>) {
        self.instances.insert(normalize_namespace(namespace), store);
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl InstanceManager for StaticInstances {
    fn get_instance(&self, namespace: &str) -> Option<Arc<dyn Store>> {
        self.instances.get(namespace).cloned()
    }
}

impl fmt::Debug for StaticInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut namespaces: Vec<&String> = self.instances.keys().collect();
        namespaces.sort();
        f.debug_struct("StaticInstances")
            .field("namespaces", &namespaces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_instances_normalizes_namespace() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(10));
        let instances = StaticInstances::new().with_instance("orders/cache", store);

        assert!(instances.get_instance("orders.cache").is_some());
        assert!(instances.get_instance("orders/cache").is_none());
        assert_eq!(instances.len(), 1);
    }

    #[test]
    fn test_static_instances_unknown_namespace() {
        assert!(StaticInstances::new().get_instance("missing").is_none());
    }
}
