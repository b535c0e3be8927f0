//! Materialization of declared functions.
//!
//! ```text
//! Unresolved ──► Cached ─────────────────────────┐
//!     │                                          ▼
//!     └────────► Generating ──► store ──► load ──► Resolved
//! ```

use std::ops::RangeInclusive;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use vibe_cache::{CacheStore, FileCacheStore};
use vibe_client::{CodeGenerator, GenerationError, HttpGenerationClient};
use vibe_core::{
    CacheKey, CacheKeyDeriver, FunctionDeclaration, IdentityDescriptor, IdentityExtractor,
    PromptBuilder, TypeRegistry,
};
use vibe_script::{CodeLoader, Module};

use crate::artifact::{Artifact, Resolution, ResolutionState};
use crate::config::{CacheFailurePolicy, VibeConfig};
use crate::error::VibeResult;

/// Source published by whichever caller generated it first.
type Slot = Arc<Mutex<Option<String>>>;

/// Removes an in-flight slot once its caller finishes or is cancelled,
/// unless a newer slot has replaced it.
struct SlotGuard<'a> {
    in_flight: &'a DashMap<String, Slot>,
    id: String,
    slot: Slot,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(&self.id, |_, current| Arc::ptr_eq(current, &self.slot));
    }
}

/// Turns declarations into loaded functions, generating each identity at
/// most once.
pub struct Orchestrator {
    config: VibeConfig,
    store: Arc<dyn CacheStore>,
    generator: Arc<dyn CodeGenerator>,
    types: TypeRegistry,
    deriver: CacheKeyDeriver,
    loader: CodeLoader,
    /// In-flight generations keyed by `{name}_{key}`.
    in_flight: DashMap<String, Slot>,
}

impl Orchestrator {
    pub fn new(
        config: VibeConfig,
        store: Arc<dyn CacheStore>,
        generator: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self {
            deriver: CacheKeyDeriver::new(config.key_policy),
            loader: CodeLoader::new(config.limits()),
            config,
            store,
            generator,
            types: TypeRegistry::new(),
            in_flight: DashMap::new(),
        }
    }

    /// File-backed cache and HTTP generation client, both from `config`.
    pub fn from_config(config: VibeConfig) -> VibeResult<Self> {
        let store = Arc::new(FileCacheStore::new(&config.cache_dir));
        let generator = Arc::new(HttpGenerationClient::new(config.client_config())?);
        Ok(Self::new(config, store, generator))
    }

    /// Definitions used to resolve custom types named in annotations.
    pub fn with_type_registry(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    pub fn config(&self) -> &VibeConfig {
        &self.config
    }

    pub fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    /// Identity and cache key of a declaration.
    pub fn identify(&self, decl: &FunctionDeclaration) -> VibeResult<(IdentityDescriptor, CacheKey)> {
        let identity = IdentityExtractor::new(&self.types).extract(decl)?;
        let key = self.deriver.derive(&identity);
        Ok((identity, key))
    }

    /// The prompt a cache miss for `decl` would send.
    pub fn prompt(&self, decl: &FunctionDeclaration) -> VibeResult<String> {
        let (identity, _) = self.identify(decl)?;
        Ok(PromptBuilder::build(&identity))
    }

    /// Resolve `decl` to a callable bound into `module`.
    ///
    /// A cached entry is loaded directly. Otherwise the source is generated,
    /// stored and then loaded; concurrent calls for the same identity wait
    /// for the first one instead of generating again. Source that fails to
    /// load stays cached.
    #[instrument(skip_all, fields(function = %decl.name()))]
    pub async fn materialize(&self, decl: &FunctionDeclaration, module: &Arc<Module>) -> VibeResult<Artifact> {
        let (identity, key) = self.identify(decl)?;
        self.transition(&identity.name, &key, ResolutionState::Unresolved);

        if let Some(source) = self.lookup(&identity.name, &key)? {
            return self.resolve(&identity, key, module, &source, Resolution::CacheHit, true);
        }

        let slot_id = format!("{}_{}", identity.name, key);
        let slot = self.in_flight.entry(slot_id.clone()).or_default().clone();
        let guard = SlotGuard {
            in_flight: &self.in_flight,
            id: slot_id,
            slot,
        };
        let outcome = self.resolve_slot(&identity, &key, &guard.slot).await;
        drop(guard);

        let (source, resolution, persisted) = outcome?;
        self.resolve(&identity, key, module, &source, resolution, persisted)
    }

    async fn resolve_slot(
        &self,
        identity: &IdentityDescriptor,
        key: &CacheKey,
        slot: &Slot,
    ) -> VibeResult<(String, Resolution, bool)> {
        let mut published = slot.lock().await;

        // Another caller may have finished while we waited.
        if let Some(source) = self.lookup(&identity.name, key)? {
            return Ok((source, Resolution::CacheHit, true));
        }
        if let Some(source) = published.as_ref() {
            return Ok((source.clone(), Resolution::Shared, false));
        }

        self.transition(&identity.name, key, ResolutionState::Generating);
        let source = self.generate(identity, key).await?;
        let persisted = self.persist(&identity.name, key, &source)?;
        *published = Some(source.clone());
        Ok((source, Resolution::Generated, persisted))
    }

    fn resolve(
        &self,
        identity: &IdentityDescriptor,
        key: CacheKey,
        module: &Arc<Module>,
        source: &str,
        resolution: Resolution,
        persisted: bool,
    ) -> VibeResult<Artifact> {
        if resolution == Resolution::CacheHit {
            self.transition(&identity.name, &key, ResolutionState::Cached);
        }

        let callable = self
            .loader
            .load_checked(source, module, &identity.name, declared_arity(identity))
            .map_err(|err| {
                warn!(
                    function = %identity.name,
                    key = key.short(),
                    error = %err,
                    "Generated source failed to load; cache entry kept"
                );
                err
            })?;

        self.transition(&identity.name, &key, ResolutionState::Resolved);
        Ok(Artifact {
            callable,
            key,
            resolution,
            persisted,
        })
    }

    async fn generate(&self, identity: &IdentityDescriptor, key: &CacheKey) -> VibeResult<String> {
        let prompt = PromptBuilder::build(identity);
        debug!(function = %identity.name, key = key.short(), prompt = %prompt, "Built generation prompt");

        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.generator.generate(&prompt).await {
                Ok(source) if source.trim().is_empty() => {
                    return Err(GenerationError::MalformedResponse("response contained no code".into()).into());
                }
                Ok(source) => {
                    info!(
                        function = %identity.name,
                        key = key.short(),
                        attempt,
                        source_chars = source.len(),
                        "Generated source"
                    );
                    return Ok(source);
                }
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.config.retry_backoff() * attempt;
                    warn!(
                        function = %identity.name,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn lookup(&self, name: &str, key: &CacheKey) -> VibeResult<Option<String>> {
        match self.store.lookup(name, key) {
            Ok(found) => Ok(found),
            Err(err) if self.config.cache_failure == CacheFailurePolicy::Degraded => {
                warn!(function = name, key = key.short(), error = %err, "Cache lookup failed, treating as a miss");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns whether the source reached the cache.
    fn persist(&self, name: &str, key: &CacheKey, source: &str) -> VibeResult<bool> {
        match self.store.store(name, key, source) {
            Ok(()) => {
                info!(function = name, key = key.short(), "Stored generated source");
                Ok(true)
            }
            Err(err) if self.config.cache_failure == CacheFailurePolicy::Degraded => {
                warn!(function = name, key = key.short(), error = %err, "Cache write failed, continuing without persistence");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn transition(&self, name: &str, key: &CacheKey, state: ResolutionState) {
        debug!(function = name, key = key.short(), state = %state, "Resolution state");
    }
}

fn declared_arity(identity: &IdentityDescriptor) -> RangeInclusive<usize> {
    identity.required_arity..=identity.param_names.len()
}
