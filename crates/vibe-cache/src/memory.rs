//! In-memory cache for tests and short-lived processes.

use std::collections::HashMap;

use parking_lot::RwLock;
use vibe_core::CacheKey;

use crate::{CacheResult, CacheStore};

/// [`CacheStore`] backed by a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<(String, CacheKey), String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn lookup(&self, name: &str, key: &CacheKey) -> CacheResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .get(&(name.to_string(), key.clone()))
            .filter(|source| !source.is_empty())
            .cloned())
    }

    fn store(&self, name: &str, key: &CacheKey, source: &str) -> CacheResult<()> {
        self.entries
            .write()
            .insert((name.to_string(), key.clone()), source.to_string());
        Ok(())
    }
}
