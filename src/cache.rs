use crate::linkbase::LinkbaseDocument;
use crate::Result;
use ahash::AHashMap;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

/// Parsed documents keyed by URI, bounded by entry count. Readers may
/// share one cache so standard taxonomy linkbases are parsed once per run.
pub struct DocumentCache<V> {
    map: RwLock<AHashMap<String, Arc<V>>>,
    capacity: usize,
}

pub type LinkbaseCache = DocumentCache<LinkbaseDocument>;

impl<V> DocumentCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: RwLock::new(AHashMap::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.map.read().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let mut map = self.map.write();
        if map.len() >= self.capacity && !map.contains_key(key) {
            if let Some(evicted) = map.keys().next().cloned() {
                map.remove(&evicted);
            }
        }
        map.insert(key.to_string(), Arc::clone(&value));
        value
    }

    /// Cached value, or the result of `load` stored under `key`. The lock is
    /// not held while loading; a concurrent miss may load twice.
    pub fn get_or_try_insert_with<F>(&self, key: &str, load: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(key) {
            debug!("cache hit {}", key);
            return Ok(value);
        }
        let value = load()?;
        Ok(self.insert(key, value))
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.map.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn clear(&self) {
        self.map.write().clear();
    }
}

impl<V> Default for DocumentCache<V> {
    fn default() -> Self {
        Self::new(256)
    }
}
