use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::core::endpoint::verifier::VerifierSettings;
use crate::core::endpoint::{ApiSecret, EndpointConfig};
use crate::core::registration::OrgInfo;

pub const DATA_DIR_ENV: &str = "LLM_ONBOARD_DATA_DIR";
pub const BACKEND_URL_ENV: &str = "LLM_ONBOARD_BACKEND_URL";
pub const API_KEY_ENV: &str = "LLM_ONBOARD_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifierFileSettings {
    pub timeout_secs: u64,
    pub allow_plain_http: bool,
}

impl Default for VerifierFileSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            allow_plain_http: false,
        }
    }
}

/// Application settings from `<data_dir>/config.toml` plus env overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub verifier: VerifierFileSettings,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let data_dir = default_data_dir()?;
        let backend_override = std::env::var(BACKEND_URL_ENV).ok();
        Self::load_from(&data_dir, backend_override)
    }

    pub fn load_from(data_dir: &Path, backend_override: Option<String>) -> Result<Self> {
        let path = data_dir.join("config.toml");
        let mut settings: Settings = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Settings::default()
        };

        if let Some(url) = backend_override.filter(|u| !u.trim().is_empty()) {
            settings.backend.url = url.trim().to_string();
        }
        settings.data_dir = data_dir.to_path_buf();
        Ok(settings)
    }

    pub fn verifier_settings(&self) -> VerifierSettings {
        VerifierSettings {
            timeout: Duration::from_secs(self.verifier.timeout_secs.max(1)),
            allow_plain_http: self.verifier.allow_plain_http,
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs.max(1))
    }

    pub fn vault_path(&self) -> PathBuf {
        self.data_dir.join("credentials.db")
    }
}

fn default_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".llm-onboard"))
        .ok_or_else(|| anyhow!("Could not find home directory; set {}", DATA_DIR_ENV))
}

/// Endpoint (and optional org) descriptor for the non-interactive commands.
#[derive(Debug, Deserialize)]
pub struct DescriptorFile {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub org: Option<OrgInfo>,
}

impl DescriptorFile {
    /// Parse a descriptor, taking the API key from `env_key` when the file has none.
    pub fn load(path: &Path, env_key: Option<String>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut file: DescriptorFile =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        if file.endpoint.api_key_secret.is_empty()
            && let Some(key) = env_key.filter(|k| !k.trim().is_empty())
        {
            file.endpoint.api_key_secret = ApiSecret::new(key);
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path(), None).unwrap();
        assert_eq!(settings.backend.url, "http://127.0.0.1:8000");
        assert_eq!(settings.verifier_settings().timeout, Duration::from_secs(30));
        assert!(!settings.verifier.allow_plain_http);
        assert_eq!(settings.vault_path(), dir.path().join("credentials.db"));
    }

    #[test]
    fn file_values_and_env_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[backend]\nurl = \"https://platform.example.com\"\n\n[verifier]\ntimeout_secs = 10\nallow_plain_http = true\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path(), None).unwrap();
        assert_eq!(settings.backend.url, "https://platform.example.com");
        assert_eq!(settings.backend.timeout_secs, 30);
        assert_eq!(settings.verifier_settings().timeout, Duration::from_secs(10));
        assert!(settings.verifier_settings().allow_plain_http);

        let overridden =
            Settings::load_from(dir.path(), Some("http://localhost:9000".into())).unwrap();
        assert_eq!(overridden.backend.url, "http://localhost:9000");
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[backend\nurl=").unwrap();
        assert!(Settings::load_from(dir.path(), None).is_err());
    }

    #[test]
    fn descriptor_reads_endpoint_and_org() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acme.toml");
        std::fs::write(
            &path,
            r#"
[endpoint]
url = "https://llm.acme.io/v1/generate"
model_name = "acme-7b"
response_path = "output.text"

[endpoint.defaults]
temperature = 0.2
max_tokens = 64

[endpoint.mapping.messages]
target_key = "inputs"

[endpoint.mapping.temperature]
enabled = false
target_key = "temperature"

[endpoint.auth]
header_name = "x-api-key"
prefix = ""

[org]
company_name = "Acme Corp"
contact_name = "Dana"
email = "dana@acme.io"
password = "pw"
"#,
        )
        .unwrap();

        let file = DescriptorFile::load(&path, Some("sk-from-env".into())).unwrap();
        let endpoint = &file.endpoint;
        assert_eq!(endpoint.api_key_secret.expose(), "sk-from-env");
        assert_eq!(endpoint.mapping.messages.target_key, "inputs");
        assert!(!endpoint.mapping.temperature.enabled);
        assert!(endpoint.mapping.max_tokens.enabled);
        assert_eq!(endpoint.auth.header_name, "x-api-key");
        assert_eq!(endpoint.auth.prefix, "");
        assert_eq!(endpoint.defaults.max_tokens, 64);
        assert_eq!(file.org.unwrap().email, "dana@acme.io");
    }

    #[test]
    fn file_api_key_wins_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.toml");
        std::fs::write(
            &path,
            "[endpoint]\nurl = \"https://x.io\"\napi_key = \"from-file\"\n",
        )
        .unwrap();
        let file = DescriptorFile::load(&path, Some("from-env".into())).unwrap();
        assert_eq!(file.endpoint.api_key_secret.expose(), "from-file");
        assert!(file.org.is_none());
    }
}
