//! Shared LRU cache for database-backed search results.
//!
//! One cache instance lives inside each dataset generation, so a reload
//! starts cold and stale entries can never outlive the data they were
//! computed from. Name, id, lonlat and keyword searches share the cache with
//! different key prefixes; keyword keys are additionally seeded so a keyword
//! equal to a place name cannot collide with a name-search entry.

use std::hash::{BuildHasher, Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use lru::LruCache;

use crate::location::LocationPtr;

/// Seed mixed into keyword-search cache keys.
pub const KEYWORD_CACHE_SEED: u64 = 0x1234_5678;

/// Seed mixed into id-search cache keys.
pub const ID_CACHE_SEED: u64 = 0x6173_0001;

/// Seed mixed into lonlat-search cache keys.
pub const LONLAT_CACHE_SEED: u64 = 0x6173_0002;

/// Fixed-seed hasher state: keys are stable for the life of the process.
fn hasher_state() -> ahash::RandomState {
    ahash::RandomState::with_seeds(
        0x0053_4d41_5254_4d45,
        0x5420_4745_4f4e_414d,
        0x4553_2043_4143_4845,
        0x2053_4545_4421_2121,
    )
}

/// Combined hash over a seed and any hashable key parts.
pub fn cache_key<K: Hash>(seed: u64, key: &K) -> u64 {
    let mut hasher = hasher_state().build_hasher();
    seed.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

pub struct SearchCache {
    entries: Mutex<LruCache<u64, Vec<LocationPtr>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    max_size: usize,
}

impl SearchCache {
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size.max(1)).expect("capacity is at least one");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            max_size,
        }
    }

    pub fn find(&self, key: u64) -> Option<Vec<LocationPtr>> {
        let mut entries = self.entries.lock().expect("cache lock");
        match entries.get(&key) {
            Some(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(hit.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: u64, value: Vec<LocationPtr>) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().expect("cache lock").put(key, value);
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Snapshot for the administrative cache status table, most recently
    /// used first.
    pub fn snapshot(&self) -> Vec<(u64, Vec<LocationPtr>)> {
        self.entries
            .lock()
            .expect("cache lock")
            .iter()
            .map(|(key, value)| (*key, value.clone()))
            .collect()
    }
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::location::QueryOptions;
    use std::sync::Arc;

    fn result(name: &str) -> Vec<LocationPtr> {
        vec![Arc::new(Location {
            name: name.into(),
            ..Location::default()
        })]
    }

    #[test]
    fn find_after_insert() {
        let cache = SearchCache::new(10);
        let key = cache_key(0, &"Helsinki");
        assert!(cache.find(key).is_none());
        cache.insert(key, result("Helsinki"));
        assert_eq!(cache.find(key).unwrap()[0].name, "Helsinki");
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = SearchCache::new(2);
        cache.insert(1, result("a"));
        cache.insert(2, result("b"));
        cache.insert(3, result("c"));
        assert!(cache.find(1).is_none());
        assert!(cache.find(3).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn keyword_seed_separates_equal_strings() {
        let opts = QueryOptions::default();
        let name_key = cache_key(0, &("mareografit", &opts));
        let keyword_key = cache_key(KEYWORD_CACHE_SEED, &("mareografit", &opts));
        assert_ne!(name_key, keyword_key);
    }

    #[test]
    fn keys_are_stable_within_a_process() {
        assert_eq!(cache_key(0, &"Kumpula"), cache_key(0, &"Kumpula"));
        assert_ne!(cache_key(0, &"Kumpula"), cache_key(0, &"Kumpulb"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = SearchCache::new(0);
        cache.insert(1, result("a"));
        assert!(cache.find(1).is_some());
    }
}
