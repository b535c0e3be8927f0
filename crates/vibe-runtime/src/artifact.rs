//! Materialized functions and how they were resolved.

use std::fmt;

use vibe_core::CacheKey;
use vibe_script::{Callable, RuntimeResult, Value};

/// Where the source of an artifact came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Read from the cache; no generation request was made.
    CacheHit,
    /// Generated by this call.
    Generated,
    /// Generated by a concurrent call for the same identity and handed over
    /// without being persisted.
    Shared,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheHit => write!(f, "cache_hit"),
            Self::Generated => write!(f, "generated"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

/// Progress of one materialization, logged at each transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Cached,
    Generating,
    Resolved,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::Cached => write!(f, "cached"),
            Self::Generating => write!(f, "generating"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// A generated function, loaded into the caller's module.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub callable: Callable,
    pub key: CacheKey,
    pub resolution: Resolution,
    /// False when the source could not be written to the cache.
    pub persisted: bool,
}

impl Artifact {
    pub fn name(&self) -> &str {
        self.callable.name()
    }

    pub fn call(&self, args: &[Value]) -> RuntimeResult<Value> {
        self.callable.call(args)
    }
}
