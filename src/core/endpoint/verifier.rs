use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::auth::{self, SecretMode};
use super::mapper::{self, SENTINEL_PROMPT};
use super::path::ResponsePath;
use super::{EndpointConfig, EndpointError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Verified,
    Failed,
}

/// Result of one connection test. Never cached across config edits.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Verified { text: String },
    Failed(EndpointError),
}

impl VerificationOutcome {
    pub fn state(&self) -> VerificationState {
        match self {
            VerificationOutcome::Verified { .. } => VerificationState::Verified,
            VerificationOutcome::Failed(_) => VerificationState::Failed,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.state() == VerificationState::Verified
    }

    pub fn extracted_text(&self) -> Option<&str> {
        match self {
            VerificationOutcome::Verified { text } => Some(text),
            VerificationOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&EndpointError> {
        match self {
            VerificationOutcome::Verified { .. } => None,
            VerificationOutcome::Failed(err) => Some(err),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(EndpointError::kind)
    }
}

impl From<Result<String, EndpointError>> for VerificationOutcome {
    fn from(res: Result<String, EndpointError>) -> Self {
        match res {
            Ok(text) => VerificationOutcome::Verified { text },
            Err(err) => VerificationOutcome::Failed(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifierSettings {
    pub timeout: Duration,
    pub allow_plain_http: bool,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            allow_plain_http: false,
        }
    }
}

/// Sends mapped requests to an org endpoint and reads the text back out.
#[derive(Clone)]
pub struct ConnectionVerifier {
    client: Client,
    settings: VerifierSettings,
}

impl ConnectionVerifier {
    pub fn new(settings: VerifierSettings) -> Result<Self, EndpointError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| EndpointError::Network(format!("Could not build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// One synthetic call with the sentinel prompt.
    pub async fn verify(
        &self,
        config: &EndpointConfig,
        cancel: &CancellationToken,
    ) -> VerificationOutcome {
        info!("Testing LLM endpoint {}", config.url);
        let outcome: VerificationOutcome = self.call(config, SENTINEL_PROMPT, cancel).await.into();
        match &outcome {
            VerificationOutcome::Verified { text } => {
                info!("LLM endpoint verified ({} chars extracted)", text.len())
            }
            VerificationOutcome::Failed(err) => {
                warn!("LLM endpoint test failed ({}): {}", err.kind(), err)
            }
        }
        outcome
    }

    /// Validate, send `prompt` and extract the text at the response path.
    pub async fn call(
        &self,
        config: &EndpointConfig,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EndpointError> {
        config.validate(self.settings.allow_plain_http)?;
        let path = ResponsePath::parse(&config.response_path)?;

        tokio::select! {
            _ = cancel.cancelled() => {
                Err(EndpointError::Network("Request cancelled".to_string()))
            }
            res = self.round_trip(config, prompt) => {
                let body = res?;
                path.extract(&body)
            }
        }
    }

    async fn round_trip(
        &self,
        config: &EndpointConfig,
        prompt: &str,
    ) -> Result<Value, EndpointError> {
        let body = mapper::build(config, prompt);
        let logged_body = serde_json::Value::Object(body.clone());
        debug!(
            headers = ?auth::headers(config, SecretMode::Mask),
            body = %logged_body,
            "POST {}",
            config.url
        );

        let res = self
            .client
            .post(config.url.trim())
            .headers(auth::header_map(config)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(EndpointError::Server {
                status: status.as_u16(),
                message: server_error_message(
                    &text,
                    status.as_u16(),
                    status.canonical_reason().unwrap_or(""),
                ),
            });
        }

        serde_json::from_str(&text).map_err(|_| {
            EndpointError::Network(format!(
                "Endpoint returned a non-JSON response (HTTP {})",
                status.as_u16()
            ))
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> EndpointError {
        if err.is_timeout() {
            EndpointError::Network(format!(
                "Request timed out after {}s",
                self.settings.timeout.as_secs()
            ))
        } else if err.is_connect() {
            EndpointError::Network(format!("Could not connect to endpoint: {}", err))
        } else {
            EndpointError::Network(format!("Request failed: {}", err))
        }
    }
}

/// Prefer `error.message`, then `message`, then `HTTP <status>: <reason>`.
fn server_error_message(body: &str, status: u16, reason: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .or_else(|| {
                    v.get("message")
                        .and_then(Value::as_str)
                        .filter(|m| !m.is_empty())
                })
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}: {}", status, reason))
}
