use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::LlmProvider;
use crate::core::endpoint::EndpointConfig;
use crate::core::endpoint::verifier::ConnectionVerifier;

/// Generates through an org endpoint described only by its field mapping,
/// auth header and response path.
pub struct MappedProvider {
    id: String,
    config: EndpointConfig,
    verifier: ConnectionVerifier,
    cancel: CancellationToken,
}

impl MappedProvider {
    pub fn new(config: EndpointConfig, verifier: ConnectionVerifier) -> Self {
        let id = url::Url::parse(config.url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "custom".to_string());
        Self {
            id,
            config,
            verifier,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts any in-flight generation when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[async_trait]
impl LlmProvider for MappedProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        info!("Generating via {} ({} prompt chars)", self.id, prompt.len());
        self.verifier
            .call(&self.config, prompt, &self.cancel)
            .await
            .map_err(|e| anyhow!("{} API Error ({}): {}", self.id, e.kind(), e))
    }
}
