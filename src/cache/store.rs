//! In-memory title store.
//!
//! LRU-bounded map from path to [`Resolution`], the default [`Cache`]
//! implementation used by the resolver.

use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;

use crate::resolver::Resolution;

use super::config::CacheConfig;
use super::item::CacheItem;
use super::lock::{rw_read, rw_write};
use super::Cache;

const SOURCE: &str = "cache::store";
const METRIC_CACHE_HIT_TOTAL: &str = "titlekeeper_cache_hit_total";
const METRIC_CACHE_MISS_TOTAL: &str = "titlekeeper_cache_miss_total";
const METRIC_CACHE_EVICT_TOTAL: &str = "titlekeeper_cache_evict_total";

/// LRU title cache.
///
/// Lookups promote the entry, hence the write lock on reads.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Resolution>>,
}

impl MemoryCache {
    /// Create a new store with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains(key)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl Cache for MemoryCache {
    fn get_item(&self, key: &str) -> CacheItem {
        let cached = rw_write(&self.entries, SOURCE, "get_item")
            .get(key)
            .cloned();

        match cached {
            Some(value) => {
                counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                CacheItem::hit(key, value)
            }
            None => {
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
                CacheItem::miss(key)
            }
        }
    }

    fn save(&self, item: CacheItem) {
        if item.get().is_unresolved() {
            self.delete(item.key());
            return;
        }

        let key = item.key().to_string();
        let value = item.into_value();
        let displaced = rw_write(&self.entries, SOURCE, "save").push(key.clone(), value);

        if let Some((evicted, _)) = displaced
            && evicted != key
        {
            counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
        }
    }

    fn delete(&self, key: &str) {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
    }

    fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }
}
