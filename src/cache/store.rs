//! Cache storage implementations.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use serde_json::Value;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Key/value store with per-entry expiry.
///
/// Implementations are best-effort: a lookup that cannot be served is a miss.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn put(&self, key: &str, value: Value, ttl: Duration);

    fn forget(&self, key: &str);

    fn flush(&self);

    /// Counter bumped by every `forget` and `flush`.
    fn generation(&self) -> u64 {
        0
    }

    /// Store `value` only if nothing was invalidated since `generation` was read.
    fn put_if_current(&self, key: &str, value: Value, ttl: Duration, _generation: u64) {
        self.put(key, value, ttl);
    }
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process LRU cache with TTL expiry checked on read.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
    generation: AtomicU64,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                counter!("bookshelf_cache_hit_total").increment(1);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        counter!("bookshelf_cache_miss_total").increment(1);
        None
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            return;
        };
        let mut entries = rw_write(&self.entries, SOURCE, "put");
        Self::insert(&mut entries, key, value, expires_at);
    }

    fn forget(&self, key: &str) {
        let mut entries = rw_write(&self.entries, SOURCE, "forget");
        entries.pop(key);
        self.generation.fetch_add(1, Ordering::AcqRel);
        counter!("bookshelf_cache_forget_total").increment(1);
    }

    fn flush(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "flush");
        entries.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn put_if_current(&self, key: &str, value: Value, ttl: Duration, generation: u64) {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            return;
        };
        let mut entries = rw_write(&self.entries, SOURCE, "put_if_current");
        // Checked under the write lock, which `forget` also holds while bumping.
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        Self::insert(&mut entries, key, value, expires_at);
    }
}

impl MemoryCache {
    fn insert(
        entries: &mut LruCache<String, Entry>,
        key: &str,
        value: Value,
        expires_at: Instant,
    ) {
        let displaced = entries.push(key.to_string(), Entry { value, expires_at });
        if displaced.is_some_and(|(evicted, _)| evicted != key) {
            counter!("bookshelf_cache_evict_total").increment(1);
        }
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default)]
pub struct DisabledCache;

impl CacheStore for DisabledCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn put(&self, _key: &str, _value: Value, _ttl: Duration) {}

    fn forget(&self, _key: &str) {}

    fn flush(&self) {}
}
