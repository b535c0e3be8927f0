//! Configuration for the orchestrator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vibe_client::HttpClientConfig;
use vibe_core::KeyPolicy;
use vibe_script::Limits;

/// What to do when the cache cannot be read or written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheFailurePolicy {
    /// Surface the error to the caller.
    #[default]
    Strict,
    /// Log a warning and carry on without persistence.
    Degraded,
}

/// Orchestrator configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct VibeConfig {
    /// Directory holding one file per generated function
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Chat completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token sent to the endpoint
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Model name sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Identity fields that feed the cache key
    #[serde(default)]
    pub key_policy: KeyPolicy,

    #[serde(default)]
    pub cache_failure: CacheFailurePolicy,

    /// Generation attempts per materialization (at least one)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts; grows linearly
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
}

impl Default for VibeConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            api_url: default_api_url(),
            api_key: default_api_key(),
            model: default_model(),
            request_timeout_secs: default_request_timeout(),
            key_policy: KeyPolicy::default(),
            cache_failure: CacheFailurePolicy::default(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            max_call_depth: default_max_call_depth(),
            max_steps: default_max_steps(),
        }
    }
}

impl fmt::Debug for VibeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VibeConfig")
            .field("cache_dir", &self.cache_dir)
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("key_policy", &self.key_policy)
            .field("cache_failure", &self.cache_failure)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_call_depth", &self.max_call_depth)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

// Default value helpers
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".function_cache")
}

fn default_api_url() -> String {
    "http://localhost:8080/v1/chat/completions".to_string()
}

fn default_api_key() -> String {
    "dummy_key".to_string()
}

fn default_model() -> String {
    "llama".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_backoff() -> u64 {
    250
}

fn default_max_call_depth() -> usize {
    128
}

fn default_max_steps() -> u64 {
    10_000_000
}

impl VibeConfig {
    /// Load configuration: defaults, then the optional file, then `VIBE_*`
    /// environment variables (`VIBE_CACHE_DIR`, `VIBE_API_KEY`, ...).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&VibeConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        // Field names contain `_`, so nesting would need a different separator.
        builder = builder.add_source(
            config::Environment::with_prefix("VIBE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_cache_failure(mut self, policy: CacheFailurePolicy) -> Self {
        self.cache_failure = policy;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn limits(&self) -> Limits {
        Limits::new(self.max_call_depth, self.max_steps)
    }

    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig::new(&self.api_url, &self.api_key, &self.model)
            .with_timeout(self.request_timeout())
    }
}
