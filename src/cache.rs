//! In-process caching of derived consumer configuration

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Result;

/// Memoizes values derived from the merged configuration.
///
/// The cache belongs to whoever builds the session and is handed to
/// consumers explicitly. Any change to the configuration must be followed
/// by [`ConfigCache::invalidate`].
#[derive(Debug, Clone)]
pub struct ConfigCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V: Clone> ConfigCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return the cached value for `key`, or compute it with `loader`.
    ///
    /// With `use_cache` off the loader always runs and its result is not
    /// stored.
    pub fn get_or_load<F>(&mut self, key: K, use_cache: bool, loader: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if use_cache {
            if let Some(cached) = self.entries.get(&key) {
                return Ok(cached.clone());
            }
        }
        let value = loader()?;
        if use_cache {
            self.entries.insert(key, value.clone());
        }
        Ok(value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every cached value.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for ConfigCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
