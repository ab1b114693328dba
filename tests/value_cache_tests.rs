//! Integration Tests for the Value Cache
//!
//! Exercises the cache end to end over the memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trace_cache::cache::{CacheEntry, CacheKey};
use trace_cache::error::BoxError;
use trace_cache::store::InstanceManager;
use trace_cache::{
    CacheError, Config, Context, MemoryStore, StaticInstances, Store, ValueCache,
};

// == Helper Functions ==

fn counting_loader(
    calls: Arc<AtomicUsize>,
) -> impl Fn(&CacheKey) -> Result<String, BoxError> + Send + Sync + 'static {
    move |key: &CacheKey| {
        calls.fetch_add(1, Ordering::SeqCst);
        match key {
            CacheKey::Signed(42) => Ok("hello".to_string()),
            other => Err(format!("no value for {other}").into()),
        }
    }
}

fn setup(namespace: &str) -> (Arc<MemoryStore>, Arc<dyn InstanceManager>) {
    let store = Arc::new(MemoryStore::new(100));
    let instances = StaticInstances::new().with_instance(namespace, store.clone());
    (store, Arc::new(instances))
}

// == Scenario ==

#[tokio::test]
async fn test_orders_scenario_cold_then_warm() {
    let (store, instances) = setup("orders/cache");
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ValueCache::new(
        "orders/cache",
        "ord",
        Duration::from_secs(5),
        instances,
        counting_loader(calls.clone()),
    );
    let ctx = Context::background();

    assert_eq!(cache.namespace(), "orders.cache");

    let out: String = cache.get(&ctx, 42).await.unwrap();
    assert_eq!(out, "hello");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let raw = store.get(&ctx, "ord.42").await.unwrap();
    let entry = CacheEntry::from_bytes(&raw).unwrap();
    assert!(entry.ok);
    assert_eq!(entry.payload, r#""hello""#);

    let ttl = store.ttl("ord.42").await.unwrap();
    assert!(ttl <= Duration::from_secs(5));

    let again: String = cache.get(&ctx, 42i64).await.unwrap();
    assert_eq!(again, "hello");
    assert_eq!(calls.load(Ordering::SeqCst), 1, "warm read must not load");
}

#[tokio::test]
async fn test_integer_kinds_share_an_entry() {
    let (_store, instances) = setup("ns");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let cache = ValueCache::new("ns", "n", Duration::from_secs(60), instances, move |key: &CacheKey| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(key.to_string())
    });
    let ctx = Context::background();

    let a: String = cache.get(&ctx, 42i32).await.unwrap();
    let b: String = cache.get(&ctx, 42u64).await.unwrap();
    let c: String = cache.get(&ctx, 42u8).await.unwrap();

    assert_eq!(a, "42");
    assert_eq!(b, "42");
    assert_eq!(c, "42");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_key_from_json_rejects_bad_kinds() {
    let result = CacheKey::try_from(serde_json::json!(4.5));
    assert!(matches!(result, Err(CacheError::InvalidKeyKind(_))));
}

// == Negative Caching ==

#[tokio::test]
async fn test_negative_entry_expires_and_reloads() {
    let (_store, instances) = setup("ns");
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ValueCache::new(
        "ns",
        "",
        Duration::from_millis(100),
        instances,
        counting_loader(calls.clone()),
    );
    let ctx = Context::background();

    assert!(matches!(
        cache.get::<String>(&ctx, 7).await,
        Err(CacheError::Load { .. })
    ));
    assert!(matches!(
        cache.get::<String>(&ctx, 7).await,
        Err(CacheError::NegativeHit { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(matches!(
        cache.get::<String>(&ctx, 7).await,
        Err(CacheError::Load { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_del_clears_negative_entry() {
    let (_store, instances) = setup("ns");
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ValueCache::new(
        "ns",
        "",
        Duration::from_secs(60),
        instances,
        counting_loader(calls.clone()),
    );
    let ctx = Context::background();

    let _ = cache.get::<String>(&ctx, "x").await;
    cache.del(&ctx, "x").await.unwrap();
    let _ = cache.get::<String>(&ctx, "x").await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_without_single_flight_all_succeed() {
    let (_store, instances) = setup("ns");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let cache = Arc::new(ValueCache::new(
        "ns",
        "",
        Duration::from_secs(60),
        instances,
        move |_key: &CacheKey| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(7u32)
        },
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get::<u32>(&Context::background(), "hot").await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 7);
    }

    // at-least-once: every caller that missed ran the loader
    let loads = calls.load(Ordering::SeqCst);
    assert!((1..=8).contains(&loads));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_flight_loads_once() {
    let (_store, instances) = setup("ns");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let cache = Arc::new(
        ValueCache::new("ns", "", Duration::from_secs(60), instances, move |_key: &CacheKey| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok("shared".to_string())
        })
        .with_single_flight(true),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get::<String>(&Context::background(), 1).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// == Configuration ==

#[tokio::test]
async fn test_cache_from_process_config() {
    let config = Config {
        namespace: "orders/cache".to_string(),
        prefix: "ord".to_string(),
        ttl_secs: 5,
        ..Default::default()
    };
    let (store, instances) = setup(&config.namespace);
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ValueCache::from_config(&config.cache_config(), instances, counting_loader(calls));

    let out: String = cache.get(&Context::background(), 42).await.unwrap();
    assert_eq!(out, "hello");
    assert!(store.ttl("ord.42").await.is_some());
}
