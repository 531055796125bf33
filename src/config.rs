//! Client configuration and its on-disk JSON form.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credential::CredentialBundle;
use crate::error::{Error, Result};
use crate::request::RATE_LIMIT_FACTOR;

pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const DEFAULT_REFERER: &str = "https://www.bilibili.com/";

/// Complete client configuration, loaded once and never mutated by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "cookies")]
    pub credentials: CredentialBundle,
    /// Headers attached to every outgoing request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub settings: Settings,
}

/// Pacing, retry and dry-run knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between consecutive requests and between retry attempts
    #[serde(rename = "delay_between_requests", default = "default_delay")]
    pub delay_secs: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Page size used when listing relations
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Simulate mutations instead of calling the API
    #[serde(default, alias = "test_mode")]
    pub dry_run: bool,
    /// Maximum candidates a dry run acts on
    #[serde(default = "default_dry_run_limit", alias = "max_test_operations")]
    pub dry_run_limit: usize,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_delay() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_batch_size() -> u32 {
    50
}

fn default_dry_run_limit() -> usize {
    5
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delay_secs: default_delay(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
            dry_run: false,
            dry_run_limit: default_dry_run_limit(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Configured delay. Out-of-range values read as zero; `validate` rejects them.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ClientConfig {
    /// Default template written right after a successful login.
    pub fn from_credentials(credentials: CredentialBundle) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        headers.insert("Referer".to_string(), DEFAULT_REFERER.to_string());
        Self {
            credentials,
            headers,
            settings: Settings::default(),
        }
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::ConfigMalformed(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigMalformed(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<()> {
        self.credentials.validate()?;
        let s = &self.settings;
        let delay = Duration::try_from_secs_f64(s.delay_secs).map_err(|_| {
            Error::ConfigMalformed(format!(
                "delay_between_requests must be a non-negative number, got {}",
                s.delay_secs
            ))
        })?;
        // the rate-limit backoff waits three delays
        if delay.checked_mul(RATE_LIMIT_FACTOR).is_none() {
            return Err(Error::ConfigMalformed(format!(
                "delay_between_requests is too large: {}",
                s.delay_secs
            )));
        }
        if s.batch_size == 0 {
            return Err(Error::ConfigMalformed("batch_size must be > 0".into()));
        }
        if s.dry_run_limit == 0 {
            return Err(Error::ConfigMalformed("dry_run_limit must be > 0".into()));
        }
        if s.api_base.is_empty() {
            return Err(Error::ConfigMalformed("api_base is empty".into()));
        }
        Ok(())
    }
}
