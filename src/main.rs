//! Trace Cache - demo driver
//!
//! Reads keys from the command line through a read-through cache backed by
//! the memory store, then hands a traced message through an envelope.
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging, install the OpenTelemetry
//!    tracer provider and W3C propagator
//! 2. Load configuration from environment variables
//! 3. Create the memory store and register it for the configured namespace
//! 4. Start background TTL cleanup task
//! 5. Read every key twice through the cache
//! 6. Send and receive one envelope, logging both contexts

use std::sync::Arc;

use anyhow::Context as _;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trace_cache::cache::CacheKey;
use trace_cache::error::BoxError;
use trace_cache::trace::{extract_context_as_string, TRACER_NAME};
use trace_cache::{
    spawn_cleanup_task, Config, Context, MemoryStore, PayloadCodec, RequestHead, StaticInstances,
    ValueCache,
};

fn load(key: &CacheKey) -> Result<String, BoxError> {
    match key {
        CacheKey::Text(text) if text.starts_with("missing") => {
            Err(format!("no row for {text}").into())
        }
        other => Ok(format!("value for {other}")),
    }
}

fn parse_key(arg: &str) -> CacheKey {
    arg.parse::<i64>()
        .map(CacheKey::from)
        .unwrap_or_else(|_| CacheKey::from(arg))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trace_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    global::set_text_map_propagator(TraceContextPropagator::new());
    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());

    let config = Config::from_env();
    info!(
        "Configuration loaded: namespace={}, prefix={:?}, ttl={}s, max_entries={}, single_flight={}",
        config.namespace, config.prefix, config.ttl_secs, config.max_entries, config.single_flight
    );

    let store = Arc::new(MemoryStore::new(config.max_entries));
    let instances = StaticInstances::new().with_instance(&config.namespace, store.clone());

    let shutdown = CancellationToken::new();
    let cleanup_handle = spawn_cleanup_task(store.clone(), config.cleanup_interval(), shutdown.clone());

    let cache = ValueCache::from_config(&config.cache_config(), Arc::new(instances), load);

    let head = RequestHead {
        uid: 10086,
        region: "local".to_string(),
        ..Default::default()
    };
    let ctx = Context::background()
        .with_head(Arc::new(head))
        .start_span(&global::tracer(TRACER_NAME), "demo");

    let mut keys: Vec<String> = std::env::args().skip(1).collect();
    if keys.is_empty() {
        keys = vec!["42".to_string(), "user".to_string(), "missing-7".to_string()];
    }

    for arg in &keys {
        for attempt in 1..=2 {
            match cache.get::<String>(&ctx, parse_key(arg)).await {
                Ok(value) => info!(key = %arg, attempt, value = %value, "cache get"),
                Err(err) => warn!(key = %arg, attempt, err = %err, "cache get failed"),
            }
        }
    }

    let stats = store.stats().await;
    info!(
        hits = stats.hits,
        misses = stats.misses,
        entries = stats.total_entries,
        hit_rate = stats.hit_rate(),
        "store statistics"
    );

    let codec = PayloadCodec::new();
    let envelope = codec
        .generate_payload(&ctx, &keys)
        .context("encode envelope")?;
    let wire = envelope.to_bytes().context("serialize envelope")?;
    info!(bytes = wire.len(), "envelope sent");

    let received = trace_cache::Envelope::from_bytes(&wire).context("parse envelope")?;
    let (recv_ctx, recv_keys): (Context, Vec<String>) = codec
        .parse_payload(&received, "demo.consume")
        .context("decode envelope")?;
    info!(
        sender = %extract_context_as_string(&ctx, true),
        receiver = %extract_context_as_string(&recv_ctx, true),
        keys = recv_keys.len(),
        "envelope received"
    );

    shutdown.cancel();
    cleanup_handle.await.context("cleanup task panicked")?;

    drop(recv_ctx);
    drop(ctx);
    if let Err(err) = provider.shutdown() {
        warn!(err = %err, "tracer provider shutdown failed");
    }
    info!("shutdown complete");

    Ok(())
}
