use std::collections::BTreeMap;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use super::{EndpointConfig, EndpointError};

/// Literal that stands in for the secret in every masked rendering.
pub const MASK: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMode {
    /// Real secret; only for the outbound call.
    Reveal,
    /// `***` in place of the secret, whatever its length.
    Mask,
}

/// `Content-Type` plus `{header_name}: {prefix}{secret}`.
pub fn headers(config: &EndpointConfig, mode: SecretMode) -> BTreeMap<String, String> {
    let secret = match mode {
        SecretMode::Reveal => config.api_key_secret.expose(),
        SecretMode::Mask => MASK,
    };

    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert(
        config.auth.header_name.trim().to_string(),
        format!("{}{}", config.auth.prefix, secret),
    );
    headers
}

/// Revealed headers as a `reqwest` header map, marking the auth value sensitive.
pub fn header_map(config: &EndpointConfig) -> Result<HeaderMap, EndpointError> {
    let mut map = HeaderMap::new();
    map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let name = parse_header_name(&config.auth.header_name)?;
    let mut value = HeaderValue::from_str(&format!(
        "{}{}",
        config.auth.prefix,
        config.api_key_secret.expose()
    ))
    .map_err(|_| {
        EndpointError::validation("Auth prefix and API key must be printable header-safe text")
    })?;
    value.set_sensitive(true);
    map.insert(name, value);
    Ok(map)
}

pub(super) fn validate(config: &EndpointConfig) -> Result<(), EndpointError> {
    header_map(config).map(|_| ())
}

fn parse_header_name(raw: &str) -> Result<HeaderName, EndpointError> {
    let name = HeaderName::from_bytes(raw.trim().as_bytes()).map_err(|_| {
        EndpointError::validation(format!("\"{}\" is not a valid header name", raw.trim()))
    })?;
    if name == CONTENT_TYPE {
        return Err(EndpointError::validation(
            "Auth header cannot replace Content-Type",
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::{ApiSecret, ErrorKind};

    const SECRET: &str = "sk-proj-9f8e7d6c5b4a";

    fn config() -> EndpointConfig {
        EndpointConfig::new("https://llm.example.com", SECRET)
    }

    #[test]
    fn reveal_sends_prefix_and_secret() {
        let headers = headers(&config(), SecretMode::Reveal);
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers["Authorization"], format!("Bearer {}", SECRET));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn mask_hides_every_part_of_the_secret() {
        let mut cfg = config();
        cfg.auth.header_name = "x-api-key".into();
        cfg.auth.prefix = "Key ".into();
        let headers = headers(&cfg, SecretMode::Mask);
        assert_eq!(headers["x-api-key"], "Key ***");

        for value in headers.values() {
            for window in 2..=SECRET.len() {
                for start in 0..=SECRET.len() - window {
                    let piece = &SECRET[start..start + window];
                    if piece.chars().all(|c| c == '*') {
                        continue;
                    }
                    assert!(!value.contains(piece), "leaked {:?}", piece);
                }
            }
        }
    }

    #[test]
    fn mask_is_length_independent() {
        let mut short = config();
        short.api_key_secret = ApiSecret::new("k");
        let mut long = config();
        long.api_key_secret = ApiSecret::new("k".repeat(200));
        assert_eq!(
            headers(&short, SecretMode::Mask),
            headers(&long, SecretMode::Mask)
        );
    }

    #[test]
    fn empty_prefix_sends_raw_secret() {
        let mut cfg = config();
        cfg.auth.header_name = "api-key".into();
        cfg.auth.prefix = String::new();
        assert_eq!(headers(&cfg, SecretMode::Reveal)["api-key"], SECRET);
        assert_eq!(headers(&cfg, SecretMode::Mask)["api-key"], "***");
    }

    #[test]
    fn header_map_marks_secret_sensitive() {
        let map = header_map(&config()).unwrap();
        let auth = map.get("authorization").unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(map.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn invalid_header_name_is_validation_error() {
        let mut cfg = config();
        cfg.auth.header_name = "bad header".into();
        assert_eq!(validate(&cfg).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn content_type_cannot_carry_auth() {
        let mut cfg = config();
        cfg.auth.header_name = "content-type".into();
        assert_eq!(validate(&cfg).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn control_characters_in_secret_are_rejected() {
        let mut cfg = config();
        cfg.api_key_secret = ApiSecret::new("abc\ndef");
        let err = validate(&cfg).unwrap_err();
        assert!(!err.to_string().contains("abc"));
    }
}
