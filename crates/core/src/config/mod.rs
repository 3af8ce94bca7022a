//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GAZETTE_*)
//! 2. TOML config file (if GAZETTE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GAZETTE_*)
/// 2. TOML config file (if GAZETTE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the content repository.
    ///
    /// Set via GAZETTE_BASE_URL environment variable. Resource names
    /// (`index.json`, `{editionId}.json`) are joined onto this prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path to SQLite cache database.
    ///
    /// Set via GAZETTE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via GAZETTE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via GAZETTE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via GAZETTE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Cache lifetime of the index document, in seconds.
    ///
    /// The index is the single source of truth for "has content changed",
    /// so it is refreshed frequently.
    #[serde(default = "default_index_ttl_secs")]
    pub index_ttl_secs: i64,

    /// Cache lifetime of edition documents, in seconds.
    ///
    /// Editions are immutable once published; freshness is decided by
    /// reconciliation against the index, not by this expiry.
    #[serde(default = "default_edition_ttl_secs")]
    pub edition_ttl_secs: i64,
}

fn default_base_url() -> String {
    "https://raw.githubusercontent.com/gazette-news/content/master/content/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./gazette-cache.sqlite")
}

fn default_user_agent() -> String {
    "gazette/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_index_ttl_secs() -> i64 {
    300
}

fn default_edition_ttl_secs() -> i64 {
    60 * 60 * 24 * 999
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            index_ttl_secs: default_index_ttl_secs(),
            edition_ttl_secs: default_edition_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `GAZETTE_`
    /// 2. TOML file from `GAZETTE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("GAZETTE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("GAZETTE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
