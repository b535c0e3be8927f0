use vibe_core::CacheKey;

use crate::CacheResult;

/// Storage for generated source text keyed by (function name, cache key).
///
/// Entries are written once and never changed in place. Implementations
/// must make a write visible to readers all at once or not at all.
pub trait CacheStore: Send + Sync {
    /// Cached source for the identity, byte for byte as stored. `Ok(None)`
    /// on a miss; an empty entry also reads as a miss.
    fn lookup(&self, name: &str, key: &CacheKey) -> CacheResult<Option<String>>;

    /// Persist source for the identity. Storing the same text twice is a no-op in effect.
    fn store(&self, name: &str, key: &CacheKey, source: &str) -> CacheResult<()>;
}
