// Search-result cache keyed by the raw query plus scope, grounded on the
// teacher's `search/cache.rs` (TTL + max-size, oldest-eviction).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::SearchResults;

struct Entry {
    results: SearchResults,
    inserted_at: Instant,
}

pub struct SearchCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    max_size: usize,
}

impl SearchCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl, max_size }
    }

    pub fn get(&self, key: &str) -> Option<SearchResults> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.results.clone());
            }
            entries.remove(key);
        }
        None
    }

    pub fn put(&self, key: String, results: SearchResults) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_size {
            if let Some(oldest_key) = entries.iter().min_by_key(|(_, e)| e.inserted_at).map(|(k, _)| k.clone()) {
                entries.remove(&oldest_key);
            }
        }
        entries.insert(key, Entry { results, inserted_at: Instant::now() });
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
