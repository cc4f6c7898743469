//! Expiring response cache keyed by normalized query text.
//!
//! Entries expire lazily: a stale entry is ignored (and dropped) on the next
//! lookup of the same key, never proactively. [`ResponseCache::clear`] is the
//! only bulk eviction. Memory therefore grows with the number of distinct
//! queries until a clear; the owning [`ChatService`](crate::chat::ChatService)
//! is expected to live for one process or session.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

/// In-process cache instance. Thread-safe; share it behind an `Arc` or own it
/// inside a service.
pub struct ResponseCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

/// Cache key: lowercase, trimmed, whitespace-collapsed query text.
pub fn cache_key(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh entry for `query`.
    pub fn get(&self, query: &str) -> Option<V> {
        self.get_at(query, Instant::now())
    }

    /// Look up an entry as of `now`.
    pub fn get_at(&self, query: &str, now: Instant) -> Option<V> {
        let key = cache_key(query);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = match entries.get(&key) {
            Some(entry) => now.saturating_duration_since(entry.created_at) < self.ttl,
            None => return None,
        };
        if fresh {
            entries.get(&key).map(|e| e.value.clone())
        } else {
            entries.remove(&key);
            None
        }
    }

    pub fn put(&self, query: &str, value: V) {
        self.put_at(query, value, Instant::now());
    }

    pub fn put_at(&self, query: &str, value: V, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            cache_key(query),
            CacheEntry {
                value,
                created_at: now,
            },
        );
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let n = entries.len();
        entries.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(cache_key("  Top 5   Candidates "), "top 5 candidates");
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.put_at("top 5 candidates", "answer".to_string(), t0);
        assert_eq!(
            cache.get_at("TOP 5  candidates", t0 + Duration::from_secs(299)),
            Some("answer".to_string())
        );
    }

    #[test]
    fn test_expired_entry_is_ignored_and_dropped() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.put_at("q", 1u32, t0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("q", t0 + Duration::from_secs(300)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stale_entries_are_not_evicted_proactively() {
        let cache = ResponseCache::new(Duration::from_secs(1));
        let t0 = Instant::now();
        cache.put_at("a", 1u32, t0);
        cache.put_at("b", 2u32, t0 + Duration::from_secs(10));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.put("a", 1u32);
        cache.put("b", 2u32);
        assert_eq!(cache.clear(), 2);
        assert!(cache.get("a").is_none());
    }
}
