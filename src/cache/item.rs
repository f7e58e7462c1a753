use crate::resolver::Resolution;

/// A single cache lookup result.
///
/// A miss yields a fresh item holding [`Resolution::Unresolved`]; it is not
/// stored until handed back to [`Cache::save`](super::Cache::save).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    key: String,
    hit: bool,
    value: Resolution,
}

impl CacheItem {
    /// Item for a key that was found in the cache.
    pub fn hit(key: impl Into<String>, value: Resolution) -> Self {
        Self {
            key: key.into(),
            hit: true,
            value,
        }
    }

    /// Item for a key that was not found in the cache.
    pub fn miss(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            hit: false,
            value: Resolution::Unresolved,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn get(&self) -> &Resolution {
        &self.value
    }

    /// Replace the value. The hit flag keeps describing the original lookup.
    pub fn set(mut self, value: Resolution) -> Self {
        self.value = value;
        self
    }

    pub fn into_value(self) -> Resolution {
        self.value
    }
}
