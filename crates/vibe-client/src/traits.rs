use async_trait::async_trait;

use crate::error::GenerationResult;

/// Turns a prompt into candidate source text.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Source extracted from the service response.
    async fn generate(&self, prompt: &str) -> GenerationResult<String>;
}
