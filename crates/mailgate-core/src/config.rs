//! Gateway configuration management.
//!
//! Configuration is stored at `~/.config/mailgate/config.json` and can be
//! overridden by environment variables (a `.env` file is honored):
//!
//! - `MAILGATE_API_BASE_URL`
//! - `MAILGATE_TIMEOUT_SECS`
//! - `MAILGATE_RENEWAL_POLICY` (`independent` | `serialized`)
//! - `MAILGATE_CREDENTIAL_BACKEND` (`keyring` | `file` | `memory`; default `file`)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{CredentialStore, FileStore, KeyringStore, MemoryStore, DEFAULT_CREDENTIAL_KEY};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "mailgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Credential file used by the `file` backend
const CREDENTIAL_FILE: &str = "credentials.json";

/// Local development API
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/aomail/";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find {0} directory")]
    MissingDirectory(&'static str),

    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// How concurrent requests that all hit an expired credential renew it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum RenewalPolicy {
    /// Every request renews on its own; the last stored token wins
    #[default]
    Independent,
    /// Renewals queue behind one lock; later requests reuse a token
    /// another request already renewed
    Serialized,
}

impl FromStr for RenewalPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(RenewalPolicy::Independent),
            "serialized" => Ok(RenewalPolicy::Serialized),
            _ => Err(ConfigError::InvalidValue {
                name: "renewal policy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Keyring,
    #[default]
    File,
    Memory,
}

impl FromStr for CredentialBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(CredentialBackend::Keyring),
            "file" => Ok(CredentialBackend::File),
            "memory" => Ok(CredentialBackend::Memory),
            _ => Err(ConfigError::InvalidValue {
                name: "credential backend",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub api_base_url: String,
    pub credential_key: String,
    pub request_timeout_secs: u64,
    pub renewal_policy: RenewalPolicy,
    /// Ask the navigation handler for a login page when no credential is stored
    pub redirect_when_unauthenticated: bool,
    pub credential_backend: CredentialBackend,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            renewal_policy: RenewalPolicy::default(),
            redirect_when_unauthenticated: false,
            credential_backend: CredentialBackend::default(),
        }
    }
}

impl GatewayConfig {
    /// Load the config file (defaults if absent), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let config = Self::load_from(&Self::config_path()?)?;
        config.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `MAILGATE_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MAILGATE_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(secs) = lookup("MAILGATE_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "MAILGATE_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
        }
        if let Some(policy) = lookup("MAILGATE_RENEWAL_POLICY") {
            self.renewal_policy = policy.parse()?;
        }
        if let Some(backend) = lookup("MAILGATE_CREDENTIAL_BACKEND") {
            self.credential_backend = backend.parse()?;
        }
        Ok(self)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::MissingDirectory("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        let data_dir = dirs::data_local_dir().ok_or(ConfigError::MissingDirectory("data"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// API base URL, always ending with `/`
    pub fn api_base_url(&self) -> String {
        let trimmed = self.api_base_url.trim();
        if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Open the configured credential backend.
    pub fn open_store(&self) -> Result<Arc<dyn CredentialStore>, ConfigError> {
        Ok(self.open_store_in(&Self::data_dir()?))
    }

    /// Open the configured credential backend, keeping any credential file under `dir`.
    pub fn open_store_in(&self, dir: &Path) -> Arc<dyn CredentialStore> {
        match self.credential_backend {
            CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
            CredentialBackend::File => Arc::new(FileStore::new(dir.join(CREDENTIAL_FILE))),
            CredentialBackend::Memory => Arc::new(MemoryStore::new()),
        }
    }
}
