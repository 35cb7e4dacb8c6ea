use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::session::DEFAULT_SESSION_CAPACITY;

pub const CONFIG_PATH_ENV: &str = "DOCQA_CONFIG";
pub const LISTEN_ADDR_ENV: &str = "DOCQA_LISTEN_ADDR";
pub const API_BASE_URL_ENV: &str = "DOCQA_API_BASE_URL";
pub const API_KEY_NAME: &str = "OPEN_API";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid secrets file {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("OPEN_API not found in {0:?} or the environment")]
    MissingApiKey(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP interface binds to
    pub listen_addr: String,

    /// Base URL of the completion API, without the `/completions` suffix
    pub api_base_url: String,

    /// Engine (model) id sent with every completion request
    pub engine: String,

    /// Characters per chunk handed to one completion request
    pub chunk_size: usize,

    /// Only the first pages of a PDF are read
    pub pdf_page_limit: usize,

    /// Maximum number of memoized completions
    pub cache_capacity: usize,

    pub max_upload_bytes: usize,

    /// Live sessions kept before the least recently used is dropped
    pub max_sessions: usize,

    /// Base name (without extension) of exported answer documents
    pub export_file_name: String,

    /// TOML file holding the API key
    pub secrets_path: PathBuf,

    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8501".to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            engine: "text-davinci-002".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            pdf_page_limit: 5,
            cache_capacity: 256,
            max_upload_bytes: 200 * 1024 * 1024,
            max_sessions: DEFAULT_SESSION_CAPACITY,
            export_file_name: "file1".to_string(),
            secrets_path: PathBuf::from(".streamlit/secrets.toml"),
            request_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file; fields it omits keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the effective configuration from the environment.
    ///
    /// `DOCQA_CONFIG` names an optional JSON file; `DOCQA_LISTEN_ADDR` and
    /// `DOCQA_API_BASE_URL` override individual fields.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                log::info!("Loading config from {:?}", path);
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(LISTEN_ADDR_ENV) {
            self.listen_addr = addr;
        }
        if let Some(url) = lookup(API_BASE_URL_ENV) {
            self.api_base_url = url;
        }
    }
}

/// Credentials read once at startup
#[derive(Clone)]
pub struct Secrets {
    pub api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").field("api_key", &"<redacted>").finish()
    }
}

impl Secrets {
    /// Read the API key from the secrets file, falling back to the
    /// `OPEN_API` environment variable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

            #[derive(Deserialize)]
            struct SecretsFile {
                #[serde(rename = "OPEN_API")]
                api_key: Option<String>,
            }

            let file: SecretsFile = toml::from_str(&raw).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?;

            if let Some(api_key) = file.api_key.filter(|key| !key.trim().is_empty()) {
                return Ok(Self { api_key });
            }
        }

        lookup(API_KEY_NAME)
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| Self { api_key })
            .ok_or_else(|| ConfigError::MissingApiKey(path.to_path_buf()))
    }
}
