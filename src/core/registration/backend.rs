use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{RegistrationError, RegistrationPayload, RegistrationReceipt};

/// Where a finished registration is submitted.
#[async_trait]
pub trait RegistrationBackend: Send + Sync {
    /// Submit the payload exactly once. Implementations must not retry.
    async fn submit(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, RegistrationError>;
}

#[derive(Deserialize)]
struct RegisterEnvelope {
    data: Option<RegistrationReceiptRaw>,
}

#[derive(Deserialize)]
struct RegistrationReceiptRaw {
    access_token: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model_version: Option<i64>,
}

/// The platform's REST API.
pub struct HttpRegistrationBackend {
    client: Client,
    base_url: String,
}

impl HttpRegistrationBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistrationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistrationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn register_url(&self) -> String {
        format!("{}/v1/org/register", self.base_url)
    }
}

#[async_trait]
impl RegistrationBackend for HttpRegistrationBackend {
    async fn submit(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        let url = self.register_url();
        info!("Submitting registration for {} to {}", payload.email, url);

        let res = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| RegistrationError::Transport(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| RegistrationError::Transport(e.to_string()))?;

        if !status.is_success() {
            let detail = rejection_detail(&text);
            warn!("Registration rejected (HTTP {}): {}", status.as_u16(), detail);
            return Err(RegistrationError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        parse_receipt(&text)
    }
}

/// FastAPI-style `detail`, which may be a string or a validation list.
fn rejection_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
    {
        Some(Value::String(detail)) if !detail.is_empty() => detail,
        Some(Value::Null | Value::String(_)) | None => "Registration failed".to_string(),
        Some(other) => other.to_string(),
    }
}

fn parse_receipt(body: &str) -> Result<RegistrationReceipt, RegistrationError> {
    let envelope: RegisterEnvelope = serde_json::from_str(body)
        .map_err(|e| RegistrationError::InvalidResponse(format!("invalid JSON: {}", e)))?;
    let data = envelope
        .data
        .ok_or_else(|| RegistrationError::InvalidResponse("missing \"data\"".to_string()))?;
    let access_token = data
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RegistrationError::InvalidResponse("missing access token".to_string()))?;

    Ok(RegistrationReceipt {
        access_token,
        org_id: data.id.map(|id| match id {
            Value::String(s) => s,
            other => other.to_string(),
        }),
        org_name: data.name,
        model_version: data.model_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::EndpointConfig;
    use crate::core::registration::tests::org;
    use crate::core::testing::{MockEndpoint, MockReply};
    use serde_json::json;

    fn payload() -> RegistrationPayload {
        RegistrationPayload::snapshot(
            &org(),
            &EndpointConfig::new("https://llm.acme.io/v1/chat", "sk-acme-1"),
        )
    }

    #[test]
    fn detail_variants() {
        assert_eq!(
            rejection_detail(r#"{"detail":"Email already registered"}"#),
            "Email already registered"
        );
        assert_eq!(rejection_detail("oops"), "Registration failed");
        assert_eq!(rejection_detail(r#"{"detail":null}"#), "Registration failed");
        assert!(rejection_detail(r#"{"detail":[{"loc":["body","email"]}]}"#).contains("email"));
    }

    #[test]
    fn receipt_requires_access_token() {
        let err = parse_receipt(r#"{"message":"ok","data":{"id":"abc"}}"#).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidResponse(_)));

        let receipt = parse_receipt(
            r#"{"message":"ok","data":{"access_token":"tok","id":"0b6f","name":"Acme","model_version":0}}"#,
        )
        .unwrap();
        assert_eq!(receipt.access_token, "tok");
        assert_eq!(receipt.org_id.as_deref(), Some("0b6f"));
        assert_eq!(receipt.model_version, Some(0));
    }

    #[tokio::test]
    async fn posts_payload_once_and_reads_token() {
        let server = MockEndpoint::start(MockReply::json(
            201,
            json!({
                "message": "Organization registered successfully",
                "data": { "access_token": "platform-token", "id": "org-1", "name": "Acme Corp" }
            }),
        ))
        .await;
        let backend =
            HttpRegistrationBackend::new(&format!("{}/", server.base_url()), Duration::from_secs(2))
                .unwrap();

        let receipt = backend.submit(&payload()).await.unwrap();
        assert_eq!(receipt.access_token, "platform-token");
        assert_eq!(receipt.org_name.as_deref(), Some("Acme Corp"));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/v1/org/register");
        assert_eq!(requests[0].body["llm_config"]["api_key"], "sk-acme-1");
        assert_eq!(requests[0].body["email"], "dana@acme.io");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn conflict_is_rejected_without_retry() {
        let server = MockEndpoint::start(MockReply::json(
            409,
            json!({ "detail": "Email already registered" }),
        ))
        .await;
        let backend =
            HttpRegistrationBackend::new(&server.base_url(), Duration::from_secs(2)).unwrap();

        let err = backend.submit(&payload()).await.unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Rejected {
                status: 409,
                detail: "Email already registered".into()
            }
        );
        assert_eq!(server.requests().len(), 1);
        server.shutdown().await;
    }
}
