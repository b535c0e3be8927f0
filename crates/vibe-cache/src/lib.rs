//! # vibe-cache
//!
//! Persists generated source text keyed by (function name, cache key).
//!
//! - [`FileCacheStore`] writes one file per entry with an atomic
//!   temp-file-and-rename publish.
//! - [`MemoryCacheStore`] keeps entries in a map.
//!
//! The store never deletes entries on its own; a bad entry stays until an
//! operator evicts it.

#![deny(unsafe_code)]

mod error;
pub mod file;
pub mod memory;
mod traits;

pub use error::{CacheError, CacheResult};
pub use file::{CacheEntryInfo, FileCacheStore, ENTRY_EXTENSION};
pub use memory::MemoryCacheStore;
pub use traits::CacheStore;
