//! Title cache.
//!
//! The [`Cache`] trait is the key-value boundary the resolver reads through;
//! [`MemoryCache`] is the LRU-bounded in-memory implementation.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! capacity = 1024
//! ```

mod config;
mod item;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use item::CacheItem;
pub use store::MemoryCache;

/// Key-value store with explicit hit/miss semantics.
pub trait Cache: Send + Sync {
    /// Look up `key`. A miss returns an unsaved item.
    fn get_item(&self, key: &str) -> CacheItem;

    /// Persist the item's current value under its key.
    fn save(&self, item: CacheItem);

    fn delete(&self, key: &str);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
