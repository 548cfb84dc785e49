pub mod backend;
pub mod persister;
pub mod session;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::endpoint::{EndpointConfig, EndpointError};

/// Organization identity collected before the endpoint step.
#[derive(Clone, PartialEq, Deserialize)]
pub struct OrgInfo {
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub webhook_endpoint: Option<String>,
}

impl fmt::Debug for OrgInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrgInfo")
            .field("company_name", &self.company_name)
            .field("contact_name", &self.contact_name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("webhook_endpoint", &self.webhook_endpoint)
            .finish()
    }
}

impl OrgInfo {
    pub fn validate(&self) -> Result<(), RegistrationError> {
        for (label, value) in [
            ("Company name", &self.company_name),
            ("Contact name", &self.contact_name),
            ("Email", &self.email),
            ("Password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(RegistrationError::Validation(format!(
                    "{} is required",
                    label
                )));
            }
        }

        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(RegistrationError::Validation(format!(
                    "\"{}\" is not a valid email address",
                    email
                )));
            }
        }

        if let Some(webhook) = self.webhook() {
            url::Url::parse(webhook).map_err(|e| {
                RegistrationError::Validation(format!("Invalid webhook endpoint: {}", e))
            })?;
        }
        Ok(())
    }

    /// Webhook URL, with blank input treated as absent.
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }
}

/// The single JSON document sent to `/v1/org/register`.
#[derive(Clone, Serialize)]
pub struct RegistrationPayload {
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub password: String,
    pub webhook_endpoint: Option<String>,
    pub llm_config: LlmConfigPayload,
}

#[derive(Clone, Serialize)]
pub struct LlmConfigPayload {
    pub endpoint: String,
    pub method: &'static str,
    pub auth: AuthPayload,
    pub api_key: String,
    pub model: Option<String>,
    pub payload_defaults: PayloadDefaultsPayload,
    pub request_mapping: BTreeMap<&'static str, String>,
    pub response_mapping: ResponseMappingPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthPayload {
    #[serde(rename = "type")]
    pub auth_type: &'static str,
    pub header: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadDefaultsPayload {
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMappingPayload {
    pub text: String,
}

impl RegistrationPayload {
    /// Freeze `org` and `config` into the wire document.
    pub fn snapshot(org: &OrgInfo, config: &EndpointConfig) -> Self {
        let request_mapping = config
            .mapping
            .enabled_fields()
            .map(|f| (f.role.as_str(), f.target_key.to_string()))
            .collect();

        Self {
            company_name: org.company_name.trim().to_string(),
            contact_name: org.contact_name.trim().to_string(),
            email: org.email.trim().to_string(),
            password: org.password.clone(),
            webhook_endpoint: org.webhook().map(str::to_string),
            llm_config: LlmConfigPayload {
                endpoint: config.url.trim().to_string(),
                method: "POST",
                auth: AuthPayload {
                    auth_type: "bearer",
                    header: config.auth.header_name.trim().to_string(),
                    prefix: config.auth.prefix.clone(),
                },
                api_key: config.api_key_secret.expose().to_string(),
                model: config.model().map(str::to_string),
                payload_defaults: PayloadDefaultsPayload {
                    temperature: config.defaults.temperature,
                    max_tokens: config.defaults.max_tokens,
                },
                request_mapping,
                response_mapping: ResponseMappingPayload {
                    text: config.response_path.trim().to_string(),
                },
            },
        }
    }
}

impl fmt::Debug for RegistrationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationPayload")
            .field("company_name", &self.company_name)
            .field("email", &self.email)
            .field("endpoint", &self.llm_config.endpoint)
            .field("model", &self.llm_config.model)
            .field("request_mapping", &self.llm_config.request_mapping)
            .finish_non_exhaustive()
    }
}

/// What the platform hands back after a successful registration.
#[derive(Clone, PartialEq)]
pub struct RegistrationReceipt {
    pub access_token: String,
    pub org_id: Option<String>,
    pub org_name: Option<String>,
    pub model_version: Option<i64>,
}

impl fmt::Debug for RegistrationReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationReceipt")
            .field("access_token", &"***")
            .field("org_id", &self.org_id)
            .field("org_name", &self.org_name)
            .field("model_version", &self.model_version)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistrationError {
    /// Organization fields are incomplete; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// The fresh pre-commit connection test did not pass.
    #[error("Connection test failed. Please verify your configuration. ({0})")]
    Verification(EndpointError),

    /// The platform backend answered with a non-2xx status.
    #[error("Registration rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// The platform backend could not be reached.
    #[error("Could not reach the platform backend: {0}")]
    Transport(String),

    /// The platform backend answered 2xx with an unusable body.
    #[error("Unexpected registration response: {0}")]
    InvalidResponse(String),
}
