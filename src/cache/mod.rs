//! Read-through caching for catalogue queries.
//!
//! Values are stored as JSON so any serializable result can share one store.
//! Entries that fail to decode are treated as misses and recomputed.

mod config;
mod keys;
pub(crate) mod lock;
mod store;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

pub use config::CacheConfig;
pub use keys::BookCacheKey;
pub use store::{CacheStore, DisabledCache, MemoryCache};

/// Build the cache selected by configuration.
pub fn build_cache(config: &CacheConfig) -> Arc<dyn CacheStore> {
    if config.enabled {
        Arc::new(MemoryCache::new(config))
    } else {
        Arc::new(DisabledCache)
    }
}

/// Return the cached value for `key`, or compute, store and return it.
///
/// `null` results are returned but not stored, so absent rows are re-queried.
/// A value computed while another caller invalidated the store is returned
/// but not stored, so a read racing a write cannot pin the old row.
pub async fn remember<T, E, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(cached) = cache.get(key) {
        match serde_json::from_value::<T>(cached) {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    target = "bookshelf::cache",
                    key,
                    error = %err,
                    "discarding undecodable cache entry"
                );
                cache.forget(key);
            }
        }
    }

    let generation = cache.generation();
    let value = compute().await?;
    match serde_json::to_value(&value) {
        Ok(serde_json::Value::Null) => {}
        Ok(encoded) => cache.put_if_current(key, encoded, ttl, generation),
        Err(err) => warn!(
            target = "bookshelf::cache",
            key,
            error = %err,
            "skipping cache store for unserializable value"
        ),
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn remember_computes_once_then_serves_cached_value() {
        let cache = MemoryCache::new(&CacheConfig::default());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Vec<u32> = remember(&cache, "numbers", HOUR, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(vec![1, 2, 3])
            })
            .await
            .expect("value");
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remember_does_not_store_absent_values() {
        let cache = MemoryCache::new(&CacheConfig::default());

        let value: Option<u32> = remember(&cache, "books.9", HOUR, || async { Ok::<_, ()>(None) })
            .await
            .expect("value");

        assert_eq!(value, None);
        assert!(cache.get("books.9").is_none());
    }

    #[tokio::test]
    async fn remember_recomputes_when_entry_does_not_decode() {
        let cache = MemoryCache::new(&CacheConfig::default());
        cache.put("numbers", json!("not a list"), HOUR);

        let value: Vec<u32> = remember(&cache, "numbers", HOUR, || async { Ok::<_, ()>(vec![7]) })
            .await
            .expect("value");

        assert_eq!(value, vec![7]);
        assert_eq!(cache.get("numbers"), Some(json!([7])));
    }

    #[tokio::test]
    async fn remember_propagates_compute_errors_without_storing() {
        let cache = MemoryCache::new(&CacheConfig::default());

        let result: Result<u32, &str> =
            remember(&cache, "numbers", HOUR, || async { Err("store down") }).await;

        assert_eq!(result, Err("store down"));
        assert!(cache.get("numbers").is_none());
    }

    #[tokio::test]
    async fn remember_skips_store_when_invalidated_mid_compute() {
        let cache = MemoryCache::new(&CacheConfig::default());

        let value: Vec<String> = remember(&cache, "books.all", HOUR, || async {
            cache.forget("books.all");
            Ok::<_, ()>(vec!["stale".to_string()])
        })
        .await
        .expect("value");

        assert_eq!(value, vec!["stale".to_string()]);
        assert!(cache.get("books.all").is_none());
    }

    #[test]
    fn build_cache_respects_enabled_flag() {
        let disabled = build_cache(&CacheConfig {
            enabled: false,
            ..Default::default()
        });
        disabled.put("k", json!(1), HOUR);
        assert!(disabled.get("k").is_none());

        let enabled = build_cache(&CacheConfig::default());
        enabled.put("k", json!(1), HOUR);
        assert_eq!(enabled.get("k"), Some(json!(1)));
    }
}
