pub mod mapped_provider;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    // Execute a single user prompt and return the generated text
    async fn generate(&self, prompt: &str) -> Result<String>;
}
