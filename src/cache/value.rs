//! Value Cache Module
//!
//! Read-through cache over a namespaced [`Store`]: a miss calls the
//! caller's loader and stores its outcome, failures included, for the
//! configured TTL.
//!
//! Concurrent misses on one key each run the loader and each write, the
//! last write winning, unless single flight is enabled.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::KeyValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::flight::SingleFlight;
use crate::cache::key::{normalize, normalize_namespace, CacheKey};
use crate::cache::CacheEntry;
use crate::context::Context;
use crate::error::{BoxError, CacheError, Result, StoreError};
use crate::store::{InstanceManager, Store};
use crate::trace::{extract_context_as_string, TRACER_NAME};

/// Span attribute holding the canonical key.
pub const SPAN_TAG_KEY: &str = "key";
/// Span attribute holding the store kind.
pub const SPAN_TAG_CACHE: &str = "cache";
/// Span attribute holding the cache operation.
pub const SPAN_TAG_OP: &str = "op";

/// Loads the value for a key on a cache miss.
pub type LoadFn<V> = Arc<dyn Fn(&CacheKey) -> std::result::Result<V, BoxError> + Send + Sync>;

// == Cache Config ==
/// Construction parameters of a [`ValueCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Namespace resolving the store instance; `/` becomes `.`
    pub namespace: String,
    /// Prepended to every key as `prefix.key` when non-empty
    pub prefix: String,
    /// Lifetime of loaded values and cached failures
    pub ttl: Duration,
    /// Serialize loads of the same key
    pub single_flight: bool,
}

impl CacheConfig {
    pub fn new(namespace: impl Into<String>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: prefix.into(),
            ttl,
            single_flight: false,
        }
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }
}

// == Value Cache ==
pub struct ValueCache<V> {
    namespace: String,
    prefix: String,
    ttl: Duration,
    load: LoadFn<V>,
    instances: Arc<dyn InstanceManager>,
    tracer: Arc<BoxedTracer>,
    flights: Option<SingleFlight>,
}

impl<V: Serialize> ValueCache<V> {
    // == Constructor ==
    pub fn new<F>(
        namespace: &str,
        prefix: &str,
        ttl: Duration,
        instances: Arc<dyn InstanceManager>,
        load: F,
    ) -> Self
    where
        F: Fn(&CacheKey) -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        Self {
            namespace: normalize_namespace(namespace),
            prefix: prefix.to_string(),
            ttl,
            load: Arc::new(load),
            instances,
            tracer: Arc::new(global::tracer(TRACER_NAME)),
            flights: None,
        }
    }

    pub fn from_config<F>(config: &CacheConfig, instances: Arc<dyn InstanceManager>, load: F) -> Self
    where
        F: Fn(&CacheKey) -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        Self::new(&config.namespace, &config.prefix, config.ttl, instances, load)
            .with_single_flight(config.single_flight)
    }

    /// Tracer used for the spans of `get` and `del`; the global tracer
    /// otherwise.
    pub fn with_tracer(mut self, tracer: BoxedTracer) -> Self {
        self.tracer = Arc::new(tracer);
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(SingleFlight::default);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_single_flight(&self) -> bool {
        self.flights.is_some()
    }

    /// Canonical store key for `key`.
    pub fn canonical_key(&self, key: &CacheKey) -> String {
        normalize(&self.prefix, key)
    }

    // == Get ==
    /// Returns the value for `key`, loading and caching it on a miss.
    ///
    /// A cached loader failure comes back as [`CacheError::NegativeHit`]
    /// without calling the loader. Store failures other than a miss are
    /// returned as [`CacheError::StoreAccess`] and never trigger a load.
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        key: impl Into<CacheKey>,
    ) -> Result<T> {
        const FUN: &str = "Cache.Get";

        let key = key.into();
        let ctx = ctx.start_span(&*self.tracer, "cache.value.Get");
        let skey = self.canonical_key(&key);
        let client = self.instance(&ctx, &skey, "get")?;

        match client.get(&ctx, &skey).await {
            Ok(data) => {
                debug!(ctx = %extract_context_as_string(&ctx, false), key = %skey, "{FUN} hit");
                return self.decode(&skey, &data);
            }
            Err(StoreError::Nil) => {
                info!(ctx = %extract_context_as_string(&ctx, false), key = %skey, "{FUN} miss");
            }
            Err(source) => {
                error!(
                    ctx = %extract_context_as_string(&ctx, false),
                    key = %skey,
                    err = %source,
                    "{FUN} store read failed"
                );
                return Err(CacheError::StoreAccess { op: FUN, key: skey, source });
            }
        }

        let Some(flights) = &self.flights else {
            return self.load_through(&ctx, client.as_ref(), &key, &skey).await;
        };

        let flight = flights.join(&skey);
        let _held = flight.mutex().lock().await;
        // another caller may have loaded the key while we waited
        match client.get(&ctx, &skey).await {
            Ok(data) => self.decode(&skey, &data),
            Err(StoreError::Nil) => self.load_through(&ctx, client.as_ref(), &key, &skey).await,
            Err(source) => Err(CacheError::StoreAccess { op: FUN, key: skey, source }),
        }
    }

    // == Del ==
    /// Deletes `key`. Deleting an absent key succeeds.
    pub async fn del(&self, ctx: &Context, key: impl Into<CacheKey>) -> Result<()> {
        const FUN: &str = "Cache.Del";

        let key = key.into();
        let ctx = ctx.start_span(&*self.tracer, "cache.value.Del");
        let skey = self.canonical_key(&key);
        let client = self.instance(&ctx, &skey, "del")?;

        client.del(&ctx, &skey).await.map_err(|source| {
            error!(
                ctx = %extract_context_as_string(&ctx, false),
                key = %skey,
                err = %source,
                "{FUN} store delete failed"
            );
            CacheError::StoreAccess { op: FUN, key: skey, source }
        })
    }

    fn instance(&self, ctx: &Context, skey: &str, op: &'static str) -> Result<Arc<dyn Store>> {
        let span = ctx.span();
        span.set_attribute(KeyValue::new(SPAN_TAG_KEY, skey.to_string()));
        span.set_attribute(KeyValue::new(SPAN_TAG_OP, op));

        let client = self.instances.get_instance(&self.namespace).ok_or_else(|| {
            error!(
                ctx = %extract_context_as_string(ctx, false),
                namespace = %self.namespace,
                "get instance err"
            );
            CacheError::StoreUnavailable {
                namespace: self.namespace.clone(),
            }
        })?;

        span.set_attribute(KeyValue::new(SPAN_TAG_CACHE, client.kind()));
        Ok(client)
    }

    /// Load, store, then read back what was stored.
    async fn load_through<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        client: &dyn Store,
        key: &CacheKey,
        skey: &str,
    ) -> Result<T> {
        const FUN: &str = "Cache.Get";

        self.load_value_to_cache(ctx, client, key, skey).await?;

        // the entry may expire or be deleted before this read
        match client.get(ctx, skey).await {
            Ok(data) => self.decode(skey, &data),
            Err(source) => {
                error!(
                    ctx = %extract_context_as_string(ctx, false),
                    key = %skey,
                    err = %source,
                    "{FUN} read after load failed"
                );
                Err(CacheError::StoreAccess {
                    op: FUN,
                    key: skey.to_string(),
                    source,
                })
            }
        }
    }

    async fn load_value_to_cache(
        &self,
        ctx: &Context,
        client: &dyn Store,
        key: &CacheKey,
        skey: &str,
    ) -> Result<()> {
        const FUN: &str = "Cache.loadValueToCache";

        let (entry, outcome) = match (self.load)(key) {
            Ok(value) => match CacheEntry::success(&value) {
                Ok(entry) => (entry, Ok(())),
                Err(source) => {
                    error!(
                        ctx = %extract_context_as_string(ctx, false),
                        key = %skey,
                        err = %source,
                        "{FUN} marshal err"
                    );
                    (
                        CacheEntry::failure(source.to_string()),
                        Err(CacheError::Encode {
                            key: skey.to_string(),
                            source,
                        }),
                    )
                }
            },
            Err(source) => {
                warn!(
                    ctx = %extract_context_as_string(ctx, false),
                    key = %skey,
                    err = %source,
                    "{FUN} load err"
                );
                (
                    CacheEntry::failure(source.to_string()),
                    Err(CacheError::Load {
                        key: skey.to_string(),
                        source,
                    }),
                )
            }
        };

        let data = entry.to_bytes().map_err(|source| CacheError::Encode {
            key: skey.to_string(),
            source,
        })?;

        let stored = client.set(ctx, skey, data, self.ttl).await;
        if let Err(source) = &stored {
            error!(
                ctx = %extract_context_as_string(ctx, false),
                key = %skey,
                err = %source,
                "{FUN} set err"
            );
        }

        // a loader or encode failure outranks a failed write
        outcome?;
        stored.map_err(|source| CacheError::StoreAccess {
            op: FUN,
            key: skey.to_string(),
            source,
        })
    }

    fn decode<T: DeserializeOwned>(&self, skey: &str, data: &[u8]) -> Result<T> {
        let entry = CacheEntry::from_bytes(data).map_err(|source| CacheError::Decode {
            key: skey.to_string(),
            source,
        })?;

        if entry.is_failure() {
            return Err(CacheError::NegativeHit {
                key: skey.to_string(),
                message: entry.payload,
            });
        }

        entry.decode().map_err(|source| CacheError::Decode {
            key: skey.to_string(),
            source,
        })
    }
}

impl<V> fmt::Debug for ValueCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCache")
            .field("namespace", &self.namespace)
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .field("single_flight", &self.flights.is_some())
            .finish()
    }
}
