use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::closure::{EntityKind, Lookup};
use crate::error::Result;

type CacheKey = (EntityKind, String);

/// Thread-safe LRU cache for lookup replies
///
/// The closure search re-issues the same lookups every round; caching the
/// replies bounds the number of calls to the remote service. A cached `None`
/// (service had no data) is a valid entry.
pub struct LookupCache {
    cache: Mutex<LruCache<CacheKey, Option<String>>>,
}

impl LookupCache {
    /// Create a new lookup cache with the specified capacity
    ///
    /// A capacity of 0 is bumped to 1 (LRU cache requires non-zero capacity).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Get a cached reply; the outer `None` is a cache miss
    pub fn get(&self, kind: EntityKind, token: &str) -> Option<Option<String>> {
        self.cache
            .lock()
            .unwrap()
            .get(&(kind, token.to_string()))
            .cloned()
    }

    /// Store a reply in the cache
    pub fn put(&self, kind: EntityKind, token: String, reply: Option<String>) {
        self.cache.lock().unwrap().put((kind, token), reply);
    }

    /// Get the current number of cached entries
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }
}

/// [`Lookup`] wrapper that answers repeated queries from a [`LookupCache`].
///
/// Failed lookups are not cached, so a transient failure gets retried in the
/// next round.
pub struct CachedLookup<L> {
    inner: L,
    cache: LookupCache,
}

impl<L> CachedLookup<L> {
    pub fn new(inner: L, capacity: usize) -> Self {
        Self {
            inner,
            cache: LookupCache::new(capacity),
        }
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: Lookup + Sync> Lookup for CachedLookup<L> {
    async fn lookup(&self, kind: EntityKind, token: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.get(kind, token) {
            log::debug!("Cache hit for {} {}", kind, token);
            return Ok(cached);
        }

        let reply = self.inner.lookup(kind, token).await?;
        self.cache.put(kind, token.to_string(), reply.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelsearchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_put_and_get() {
        let cache = LookupCache::new(10);
        cache.put(EntityKind::Place, "WARSAW".to_string(), Some("JOHN".to_string()));
        assert_eq!(
            cache.get(EntityKind::Place, "WARSAW"),
            Some(Some("JOHN".to_string()))
        );
    }

    #[test]
    fn test_cache_keys_by_kind() {
        let cache = LookupCache::new(10);
        cache.put(EntityKind::Place, "ADAM".to_string(), None);
        assert_eq!(cache.get(EntityKind::Place, "ADAM"), Some(None));
        assert_eq!(cache.get(EntityKind::Person, "ADAM"), None);
    }

    #[test]
    fn test_cache_eviction() {
        let cache = LookupCache::new(2);
        cache.put(EntityKind::Person, "A".to_string(), None);
        cache.put(EntityKind::Person, "B".to_string(), None);
        cache.put(EntityKind::Person, "C".to_string(), None);

        assert!(cache.get(EntityKind::Person, "A").is_none()); // Evicted
        assert!(cache.get(EntityKind::Person, "B").is_some());
        assert!(cache.get(EntityKind::Person, "C").is_some());
    }

    #[test]
    fn test_cache_len_and_clear() {
        let cache = LookupCache::new(10);
        assert!(cache.is_empty());
        cache.put(EntityKind::Person, "A".to_string(), None);
        cache.put(EntityKind::Place, "A".to_string(), None);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_capacity_zero_is_one() {
        let cache = LookupCache::new(0);
        cache.put(EntityKind::Person, "A".to_string(), None);
        cache.put(EntityKind::Person, "B".to_string(), None);
        assert_eq!(cache.len(), 1);
    }

    /// Counts calls; fails for tokens starting with `!`.
    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    impl Lookup for CountingLookup {
        async fn lookup(&self, _kind: EntityKind, token: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token.starts_with('!') {
                return Err(RelsearchError::Http("timeout".to_string()));
            }
            Ok(Some(format!("seen {}", token)))
        }
    }

    #[tokio::test]
    async fn test_cached_lookup_hits_cache() {
        let lookup = CachedLookup::new(CountingLookup::default(), 10);
        let first = lookup.lookup(EntityKind::Place, "WARSAW").await.unwrap();
        let second = lookup.lookup(EntityKind::Place, "WARSAW").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(lookup.into_inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_lookup_does_not_cache_failures() {
        let lookup = CachedLookup::new(CountingLookup::default(), 10);
        assert!(lookup.lookup(EntityKind::Person, "!X").await.is_err());
        assert!(lookup.lookup(EntityKind::Person, "!X").await.is_err());
        assert!(lookup.cache().is_empty());
        assert_eq!(lookup.into_inner().calls.load(Ordering::SeqCst), 2);
    }
}
