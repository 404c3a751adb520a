//! Response cache with per-entry time-to-live.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Trait for cache implementations.
///
/// Every call is treated as an atomic operation; implementations decide
/// their own locking.
pub trait Cache: Send + Sync {
    /// Whether a live entry exists for the key.
    fn has(&self, key: &str) -> bool;

    /// Get a cached value by key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value which expires after `ttl`.
    fn set(&self, key: &str, value: Value, ttl: Duration);
}

/// A cached entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value.
    pub value: Value,
    /// When the entry stops being served.
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Generate a cache key for a rendered request.
///
/// `scope` identifies the kind of request (usually a type name). The
/// arguments are serialized with sorted keys, so equal argument sets always
/// produce the same key regardless of insertion order.
pub fn generate_cache_key(scope: &str, endpoint: &str, args: &Map<String, Value>) -> String {
    let canonical = canonical_json(args);
    format!(
        "{}:{}",
        endpoint,
        hash_string(&format!("{scope}\n{endpoint}\n{canonical}"))
    )
}

fn canonical_json(args: &Map<String, Value>) -> String {
    // serde_json::Map is ordered by key, nested maps included.
    Value::Object(args.clone()).to_string()
}

/// Hash a string using SHA-256 (truncated to 16 chars for cache keys).
pub fn hash_string(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

/// Return the cached value for `key`, or compute, store and return it.
///
/// Without a cache every call runs `compute`.
pub async fn get_or_set<T, F, Fut>(
    cache: Option<&dyn Cache>,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    get_or_set_if(cache, key, ttl, compute, |_| true).await
}

/// Like [`get_or_set`], but a computed value is only stored when `keep`
/// accepts it.
pub async fn get_or_set_if<T, F, Fut, K>(
    cache: Option<&dyn Cache>,
    key: &str,
    ttl: Duration,
    compute: F,
    keep: K,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    K: FnOnce(&T) -> bool,
{
    let cache = match cache {
        Some(c) => c,
        None => return compute().await,
    };

    if let Some(value) = cache.get(key) {
        debug!(key = key, "cache hit");
        return Ok(serde_json::from_value(value)?);
    }

    debug!(key = key, "cache miss");
    let content = compute().await?;
    if keep(&content) {
        cache.set(key, serde_json::to_value(&content)?, ttl);
    } else {
        debug!(key = key, "computed value not cached");
    }

    Ok(content)
}

/// In-memory cache implementation with oldest-first eviction.
pub struct MemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    order: Arc<RwLock<VecDeque<String>>>,
    max_entries: usize,
}

impl MemoryCache {
    /// Create a new memory cache with the given maximum entries.
    ///
    /// Storage grows on demand, so a large limit does not allocate up front.
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            order: Arc::new(RwLock::new(VecDeque::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Get the current number of entries, expired ones included.
    pub fn size(&self) -> usize {
        self.store.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Delete an entry.
    pub fn delete(&self, key: &str) {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);

        store.remove(key);
        order.retain(|k| k != key);
    }

    /// Clear all entries.
    pub fn clear(&self) {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);
        store.clear();
        order.clear();
    }
}

impl Cache for MemoryCache {
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<Value> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let entry = store.get(key)?;

        if entry.is_expired(Instant::now()) {
            return None;
        }

        Some(entry.value.clone())
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);

        if !store.contains_key(key) {
            // Evict oldest if at capacity
            while store.len() >= self.max_entries {
                match order.pop_front() {
                    Some(oldest) => {
                        store.remove(&oldest);
                    }
                    None => break,
                }
            }
            order.push_back(key.to_string());
        }

        store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new(2);
        cache.set("k1", json!("v1"), Duration::from_secs(3600));

        assert!(cache.has("k1"));
        assert_eq!(cache.get("k1"), Some(json!("v1")));
        assert!(cache.get("k2").is_none());

        cache.delete("k1");
        assert!(!cache.has("k1"));
    }

    #[test]
    fn test_memory_cache_expiry() {
        let cache = MemoryCache::new(2);
        cache.set("k1", json!(1), Duration::ZERO);

        assert!(!cache.has("k1"));
        assert!(cache.get("k1").is_none());
    }

    #[test]
    fn test_memory_cache_evicts_oldest() {
        let cache = MemoryCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", json!(1), ttl);
        cache.set("b", json!(2), ttl);
        cache.set("a", json!(3), ttl);
        cache.set("c", json!(4), ttl);

        assert_eq!(cache.size(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(4)));

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_cache_key_ignores_argument_order() {
        let mut first = Map::new();
        first.insert("page".into(), json!(1));
        first.insert("filter".into(), json!({"b": 1, "a": 2}));

        let mut second = Map::new();
        second.insert("filter".into(), json!({"a": 2, "b": 1}));
        second.insert("page".into(), json!(1));

        assert_eq!(
            generate_cache_key("User", "admin/user", &first),
            generate_cache_key("User", "admin/user", &second)
        );
    }

    #[test]
    fn test_cache_key_differs_by_scope_endpoint_and_args() {
        let a = args(json!({"page": 1}));
        let b = args(json!({"page": 2}));
        let key = generate_cache_key("User", "admin/user", &a);

        assert_ne!(key, generate_cache_key("File", "admin/user", &a));
        assert_ne!(key, generate_cache_key("User", "admin/file", &a));
        assert_ne!(key, generate_cache_key("User", "admin/user", &b));
    }

    #[test]
    fn test_hash_string() {
        let h1 = hash_string("test");
        let h2 = hash_string("test");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 16);

        let h3 = hash_string("other");
        assert_ne!(h1, h3);
    }

    #[tokio::test]
    async fn test_get_or_set_computes_once() {
        let cache = MemoryCache::default();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        for _ in 0..2 {
            let value: Value = get_or_set(Some(&cache), "key", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"id": 1}))
            })
            .await
            .unwrap();
            assert_eq!(value, json!({"id": 1}));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_without_cache_always_computes() {
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: u32 = get_or_set(None, "key", Duration::from_secs(60), || async {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
            })
            .await
            .unwrap();
            assert!(value < 3);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_get_or_set_if_skips_rejected_values() {
        let cache = MemoryCache::default();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        for _ in 0..2 {
            let status: u16 = get_or_set_if(
                Some(&cache),
                "key",
                ttl,
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(503)
                },
                |status| *status < 300,
            )
            .await
            .unwrap();
            assert_eq!(status, 503);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.has("key"));
    }

    #[test]
    fn test_memory_cache_huge_limit_does_not_preallocate() {
        let cache = MemoryCache::new(usize::MAX);
        cache.set("k", json!(1), Duration::from_secs(60));
        assert_eq!(cache.size(), 1);

        let cache = MemoryCache::new(0);
        cache.set("k", json!(1), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_get_or_set_does_not_store_errors() {
        let cache = MemoryCache::default();
        let result: Result<u32> = get_or_set(Some(&cache), "key", Duration::from_secs(60), || async {
            Err(crate::Error::Timeout)
        })
        .await;

        assert!(result.is_err());
        assert!(!cache.has("key"));
    }
}
