// Bounded LRU cache for query embeddings (§5 "per-component caches: query-
// embedding LRU with bounded size"). Grounded on the teacher's
// `EmbeddingCache`, narrowed to the query path only — document embeddings are
// never cached since they are produced once per chunk at index time.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

pub struct QueryEmbeddingCache {
    entries: Mutex<LruCache<String, Vec<f32>>>,
    stats: Mutex<CacheStats>,
}

impl QueryEmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self { entries: Mutex::new(LruCache::new(capacity)), stats: Mutex::new(CacheStats::default()) }
    }

    fn key(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, query: &str) -> Option<Vec<f32>> {
        let key = Self::key(query);
        let mut entries = self.entries.lock();
        let hit = entries.get(&key).cloned();
        let mut stats = self.stats.lock();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    pub fn put(&self, query: &str, vector: Vec<f32>) {
        let key = Self::key(query);
        self.entries.lock().put(key, vector);
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_by_query_text() {
        let cache = QueryEmbeddingCache::new(10);
        cache.put("search function", vec![0.1, 0.2]);
        assert_eq!(cache.get("search function"), Some(vec![0.1, 0.2]));
        assert_eq!(cache.get("other query"), None);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let cache = QueryEmbeddingCache::new(1);
        cache.put("a", vec![1.0]);
        cache.put("b", vec![2.0]);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(vec![2.0]));
    }
}
