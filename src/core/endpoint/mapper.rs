use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::EndpointConfig;
use super::auth::{self, SecretMode};

/// Fixed prompt sent by every connection test.
pub const SENTINEL_PROMPT: &str = "hi";

/// Build the JSON body for `prompt` from the config's field mapping.
///
/// `messages` is always present. `model` is skipped when no model name is
/// set, even if enabled. Disabled optional fields contribute nothing.
pub fn build(config: &EndpointConfig, prompt: &str) -> Map<String, Value> {
    let mapping = &config.mapping;
    let mut body = Map::new();

    body.insert(
        mapping.messages.target_key.clone(),
        json!([{ "role": "user", "content": prompt }]),
    );

    if mapping.model.enabled
        && let Some(model) = config.model()
    {
        body.insert(mapping.model.target_key.clone(), json!(model));
    }

    if mapping.temperature.enabled {
        body.insert(
            mapping.temperature.target_key.clone(),
            json!(config.defaults.temperature),
        );
    }

    if mapping.max_tokens.enabled {
        body.insert(
            mapping.max_tokens.target_key.clone(),
            json!(config.defaults.max_tokens),
        );
    }

    body
}

/// What a connection test would send, with the secret masked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestPreview {
    pub method: &'static str,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Map<String, Value>,
}

pub fn preview(config: &EndpointConfig) -> RequestPreview {
    RequestPreview {
        method: "POST",
        url: config.url.clone(),
        headers: auth::headers(config, SecretMode::Mask),
        body: build(config, SENTINEL_PROMPT),
    }
}
