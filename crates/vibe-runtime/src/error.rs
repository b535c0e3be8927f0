//! Orchestrator errors.

use thiserror::Error;
use vibe_cache::CacheError;
use vibe_client::GenerationError;
use vibe_core::IdentityError;
use vibe_script::LoadError;

/// Result type for orchestrator operations.
pub type VibeResult<T> = Result<T, VibeError>;

/// Why a declaration could not be materialized.
#[derive(Debug, Error)]
pub enum VibeError {
    /// The declaration itself is invalid. Not retried.
    #[error("invalid declaration: {0}")]
    Identity(#[from] IdentityError),

    /// The cache could not be read or written.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The generation service failed. Nothing was cached.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Generated source could not be loaded. The entry stays in the cache.
    #[error("failed to load generated source: {0}")]
    Load(#[from] LoadError),
}
