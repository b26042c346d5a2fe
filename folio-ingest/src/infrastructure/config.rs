//! Configuration management for the ingest server

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::http_fetcher::DEFAULT_RAW_URL_TEMPLATE;
use super::retry::RetryPolicy;

/// Environment variable that overrides `webhook.secret`.
pub const SECRET_ENV_VAR: &str = "FOLIO_WEBHOOK_SECRET";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FolioConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

impl FolioConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Replace the webhook secret with the value of `FOLIO_WEBHOOK_SECRET`, if set.
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
            self.webhook.secret = secret;
        }
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "webhook.secret is empty (set it in the config file or {SECRET_ENV_VAR})"
            )));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.repository.local_root.is_none()
            && !self.repository.raw_url_template.contains("{path}")
        {
            return Err(ConfigError::Invalid(
                "repository.raw_url_template must contain {path}".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// HTTP API listen address.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Data directory for persistence.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub store: StoreBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_dir: default_data_dir(),
            store: StoreBackend::default(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureScheme {
    /// `X-Hub-Signature-256: sha256=<hex>` over the body.
    #[default]
    HmacSha256,
    /// The secret itself in `X-Webhook-Token`.
    Token,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WebhookConfig {
    #[serde(default)]
    pub scheme: SignatureScheme,

    /// Shared secret. Prefer `FOLIO_WEBHOOK_SECRET` over writing it here.
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// URL template with `{repository}`, `{commit}` and `{path}` placeholders.
    #[serde(default = "default_raw_url_template")]
    pub raw_url_template: String,

    /// Bearer token for private repositories.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Read from a local checkout instead of over HTTP.
    #[serde(default)]
    pub local_root: Option<PathBuf>,

    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,

    #[serde(default = "default_projects_dir")]
    pub projects_dir: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            raw_url_template: default_raw_url_template(),
            auth_token: None,
            local_root: None,
            posts_dir: default_posts_dir(),
            projects_dir: default_projects_dir(),
        }
    }
}

fn default_raw_url_template() -> String {
    DEFAULT_RAW_URL_TEMPLATE.to_string()
}

fn default_posts_dir() -> String {
    "Posts".to_string()
}

fn default_projects_dir() -> String {
    "projects".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl FetchConfig {
    /// Returns the per-attempt timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            attempt_timeout: self.timeout(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    2000
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
