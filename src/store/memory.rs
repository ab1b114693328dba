//! Memory Store Module
//!
//! In-process store: HashMap storage with LRU tracking and TTL expiration,
//! behind the async [`Store`] protocol.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::context::Context;
use crate::error::StoreError;
use crate::store::{LruTracker, Store, StoreStats, StoredValue, MAX_KEY_LENGTH, MAX_VALUE_SIZE};

#[derive(Debug, Default)]
struct Entries {
    values: HashMap<String, StoredValue>,
    lru: LruTracker,
    stats: StoreStats,
}

impl Entries {
    fn remove(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key).is_some();
        self.lru.remove(key);
        self.stats.set_total_entries(self.values.len());
        removed
    }
}

// == Memory Store ==
/// Thread-safe in-memory store with LRU eviction and TTL support.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
    max_entries: usize,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` values.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_entries,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Stats ==
    pub async fn stats(&self) -> StoreStats {
        let entries = self.entries.read().await;
        let mut stats = entries.stats.clone();
        stats.set_total_entries(entries.values.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes every expired value, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let expired: Vec<String> = entries
            .values
            .iter()
            .filter(|(_, value)| value.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.remove(key);
        }
        entries.stats.record_expirations(expired.len());
        expired.len()
    }

    /// Remaining TTL of a live key.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries
            .values
            .get(key)
            .filter(|value| !value.is_expired())
            .and_then(StoredValue::ttl_remaining)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.values.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

fn check_cancelled(ctx: &Context) -> Result<(), StoreError> {
    if ctx.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    // == Get ==
    /// Returns a live value; expired values are dropped and reported as nil.
    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>, StoreError> {
        check_cancelled(ctx)?;

        let mut guard = self.entries.write().await;
        let entries = &mut *guard;
        let expired = match entries.values.get(key) {
            Some(value) if !value.is_expired() => {
                let data = value.value.clone();
                entries.stats.record_hit();
                entries.lru.touch(key);
                return Ok(data);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
            entries.stats.record_expirations(1);
        }
        entries.stats.record_miss();
        Err(StoreError::Nil)
    }

    // == Set ==
    /// Stores a value, overwriting and resetting the TTL of an existing one.
    /// At capacity the least recently used value is evicted first.
    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        check_cancelled(ctx)?;

        if key.len() > MAX_KEY_LENGTH {
            return Err(StoreError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(StoreError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let mut entries = self.entries.write().await;
        let is_overwrite = entries.values.contains_key(key);

        if !is_overwrite && entries.values.len() >= self.max_entries {
            match entries.lru.evict_oldest() {
                Some(evicted) => {
                    debug!(key = %evicted, "evicting least recently used value");
                    entries.values.remove(&evicted);
                    entries.stats.record_eviction();
                }
                None => {
                    return Err(StoreError::CacheFull(
                        "Store is full and eviction failed".to_string(),
                    ))
                }
            }
        }

        entries
            .values
            .insert(key.to_string(), StoredValue::new(value, ttl));
        entries.lru.touch(key);
        let len = entries.values.len();
        entries.stats.set_total_entries(len);

        Ok(())
    }

    // == Delete ==
    /// Removes a value. Deleting an absent key is not an error.
    async fn del(&self, ctx: &Context, key: &str) -> Result<(), StoreError> {
        check_cancelled(ctx)?;

        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
