//! Bounded LRU cache for loaded home documents
//!
//! The cache is an ordinary value owned by whoever needs memoized reads
//! (normally [`HomeService`](crate::service::HomeService)). It is not `Sync`;
//! wrap it in a `Mutex` to share it across threads.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::widget::HomeDoc;

/// Default number of documents kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub capacity: usize,
}

pub struct DocCache {
    entries: LruCache<String, HomeDoc>,
    stats: CacheStats,
}

impl DocCache {
    /// Create a cache holding at most `capacity` documents (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats {
                capacity: cap.get(),
                ..Default::default()
            },
        }
    }

    /// Look up a document, marking it most recently used
    pub fn get(&mut self, id: &str) -> Option<HomeDoc> {
        match self.entries.get(id) {
            Some(doc) => {
                self.stats.hits += 1;
                Some(doc.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or refresh a document
    pub fn put(&mut self, doc: HomeDoc) {
        if let Some((evicted, _)) = self.entries.push(doc.id.clone(), doc) {
            if !self.entries.contains(&evicted) {
                self.stats.evictions += 1;
            }
        }
    }

    pub fn invalidate(&mut self, id: &str) {
        self.entries.pop(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for DocCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for DocCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocCache")
            .field("len", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(id: &str) -> HomeDoc {
        HomeDoc::empty(id, Utc::now())
    }

    #[test]
    fn test_get_after_put() {
        let mut cache = DocCache::new(2);
        cache.put(doc("a"));
        assert_eq!(cache.get("a").map(|d| d.id), Some("a".to_string()));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = DocCache::new(2);
        cache.put(doc("a"));
        cache.put(doc("b"));
        cache.get("a");
        cache.put(doc("c"));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_refresh_is_not_an_eviction() {
        let mut cache = DocCache::new(2);
        cache.put(doc("a"));
        cache.put(doc("a"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = DocCache::new(2);
        cache.put(doc("a"));
        cache.invalidate("a");
        assert!(cache.is_empty());
    }
}
