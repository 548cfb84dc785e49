pub mod auth;
pub mod error;
pub mod mapper;
pub mod path;
pub mod verifier;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use error::{EndpointError, ErrorKind};

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.0;
pub const MIN_MAX_TOKENS: u32 = 1;
pub const MAX_MAX_TOKENS: u32 = 512;

/// Logical request fields an org endpoint can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Model,
    Messages,
    Temperature,
    MaxTokens,
}

impl FieldRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::Model => "model",
            FieldRole::Messages => "messages",
            FieldRole::Temperature => "temperature",
            FieldRole::MaxTokens => "max_tokens",
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field every chat-style request carries. It has no `enabled` switch;
/// one found in stored config is ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredField {
    pub target_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionalField {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub target_key: String,
}

fn default_true() -> bool {
    true
}

impl OptionalField {
    fn new(role: FieldRole) -> Self {
        Self {
            enabled: true,
            target_key: role.as_str().to_string(),
        }
    }
}

/// Flattened view of one mapping rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping<'a> {
    pub role: FieldRole,
    pub enabled: bool,
    pub target_key: &'a str,
}

/// Which logical fields go into the request body, and under which key names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMapping {
    #[serde(default = "default_messages_field")]
    pub messages: RequiredField,
    #[serde(default = "default_model_field")]
    pub model: OptionalField,
    #[serde(default = "default_temperature_field")]
    pub temperature: OptionalField,
    #[serde(default = "default_max_tokens_field")]
    pub max_tokens: OptionalField,
}

fn default_messages_field() -> RequiredField {
    RequiredField {
        target_key: FieldRole::Messages.as_str().to_string(),
    }
}

fn default_model_field() -> OptionalField {
    OptionalField::new(FieldRole::Model)
}

fn default_temperature_field() -> OptionalField {
    OptionalField::new(FieldRole::Temperature)
}

fn default_max_tokens_field() -> OptionalField {
    OptionalField::new(FieldRole::MaxTokens)
}

impl Default for RequestMapping {
    fn default() -> Self {
        Self {
            messages: default_messages_field(),
            model: default_model_field(),
            temperature: default_temperature_field(),
            max_tokens: default_max_tokens_field(),
        }
    }
}

impl RequestMapping {
    /// All four rules in a fixed order; `messages` always reports enabled.
    pub fn fields(&self) -> [FieldMapping<'_>; 4] {
        [
            FieldMapping {
                role: FieldRole::Messages,
                enabled: true,
                target_key: &self.messages.target_key,
            },
            FieldMapping {
                role: FieldRole::Model,
                enabled: self.model.enabled,
                target_key: &self.model.target_key,
            },
            FieldMapping {
                role: FieldRole::Temperature,
                enabled: self.temperature.enabled,
                target_key: &self.temperature.target_key,
            },
            FieldMapping {
                role: FieldRole::MaxTokens,
                enabled: self.max_tokens.enabled,
                target_key: &self.max_tokens.target_key,
            },
        ]
    }

    pub fn optional_mut(&mut self, role: FieldRole) -> Option<&mut OptionalField> {
        match role {
            FieldRole::Model => Some(&mut self.model),
            FieldRole::Temperature => Some(&mut self.temperature),
            FieldRole::MaxTokens => Some(&mut self.max_tokens),
            FieldRole::Messages => None,
        }
    }

    pub fn enabled_fields(&self) -> impl Iterator<Item = FieldMapping<'_>> {
        self.fields().into_iter().filter(|f| f.enabled)
    }

    fn validate(&self) -> Result<(), EndpointError> {
        let mut seen = HashSet::new();
        for field in self.enabled_fields() {
            let key = field.target_key;
            if key.trim().is_empty() {
                return Err(EndpointError::validation(format!(
                    "Target key for \"{}\" must not be empty",
                    field.role
                )));
            }
            if key != key.trim() {
                return Err(EndpointError::validation(format!(
                    "Target key \"{}\" for \"{}\" has leading or trailing whitespace",
                    key, field.role
                )));
            }
            if !seen.insert(key) {
                return Err(EndpointError::validation(format!(
                    "Target key \"{}\" is mapped more than once",
                    key
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for PayloadDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl PayloadDefaults {
    fn validate(&self) -> Result<(), EndpointError> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(EndpointError::validation(format!(
                "Temperature must be between {} and {}",
                MIN_TEMPERATURE, MAX_TEMPERATURE
            )));
        }
        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.max_tokens) {
            return Err(EndpointError::validation(format!(
                "Max tokens must be between {} and {}",
                MIN_MAX_TOKENS, MAX_MAX_TOKENS
            )));
        }
        Ok(())
    }
}

/// How the API key is attached: `{header_name}: {prefix}{secret}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_header")]
    pub header_name: String,
    #[serde(default = "default_auth_prefix")]
    pub prefix: String,
}

fn default_auth_header() -> String {
    "Authorization".to_string()
}

fn default_auth_prefix() -> String {
    "Bearer ".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header_name: default_auth_header(),
            prefix: default_auth_prefix(),
        }
    }
}

/// The org's API key. Formatting never prints the value.
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct ApiSecret(String);

impl ApiSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecret(***)")
    }
}

impl fmt::Display for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(auth::MASK)
    }
}

/// Everything needed to call an org-supplied LLM endpoint.
///
/// Not `Serialize`: the secret leaves the process in cleartext only
/// through the registration payload and the outbound call itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default, rename = "api_key")]
    pub api_key_secret: ApiSecret,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub defaults: PayloadDefaults,
    #[serde(default)]
    pub mapping: RequestMapping,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "default_response_path")]
    pub response_path: String,
}

fn default_response_path() -> String {
    "choices[0].message.content".to_string()
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key_secret: ApiSecret::new(api_key),
            model_name: None,
            defaults: PayloadDefaults::default(),
            mapping: RequestMapping::default(),
            auth: AuthConfig::default(),
            response_path: default_response_path(),
        }
    }

    /// Model name to send, if any. Blank names count as absent.
    pub fn model(&self) -> Option<&str> {
        self.model_name
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Check every field that must hold before a request is attempted.
    pub fn validate(&self, allow_plain_http: bool) -> Result<(), EndpointError> {
        if self.url.trim().is_empty() || self.api_key_secret.is_empty() {
            return Err(EndpointError::validation(
                "Please provide endpoint and API key",
            ));
        }

        let parsed = url::Url::parse(self.url.trim())
            .map_err(|e| EndpointError::validation(format!("Invalid endpoint URL: {}", e)))?;
        match parsed.scheme() {
            "https" => {}
            "http" if allow_plain_http => {}
            other => {
                return Err(EndpointError::validation(format!(
                    "Endpoint URL must use https (got {})",
                    other
                )));
            }
        }

        self.defaults.validate()?;
        self.mapping.validate()?;
        auth::validate(self)?;
        path::ResponsePath::parse(&self.response_path)?;
        Ok(())
    }

    /// Digest over every field, secret included. Equal fingerprints mean
    /// a verification result still applies.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        let mut hasher = Sha256::new();
        let fields: [&str; 7] = [
            &self.url,
            self.api_key_secret.expose(),
            self.model_name.as_deref().unwrap_or(""),
            &self.auth.header_name,
            &self.auth.prefix,
            &self.response_path,
            &self.mapping.messages.target_key,
        ];
        for field in fields {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update([u8::from(self.model_name.is_some())]);
        hasher.update(self.defaults.temperature.to_bits().to_le_bytes());
        hasher.update(self.defaults.max_tokens.to_le_bytes());
        for optional in [
            &self.mapping.model,
            &self.mapping.temperature,
            &self.mapping.max_tokens,
        ] {
            hasher.update([u8::from(optional.enabled)]);
            hasher.update((optional.target_key.len() as u64).to_le_bytes());
            hasher.update(optional.target_key.as_bytes());
        }
        ConfigFingerprint(hex::encode(hasher.finalize()))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConfigFingerprint(String);

impl fmt::Debug for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigFingerprint({}..)", &self.0[..8.min(self.0.len())])
    }
}
