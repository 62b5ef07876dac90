//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SUBDX_*)
//! 2. TOML config file (if SUBDX_CONFIG_FILE set)
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
/// 1. Environment variables (SUBDX_*)
/// 2. TOML config file (if SUBDX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SUBDX_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL of the upstream subtitle site.
    ///
    /// Set via SUBDX_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the title metadata service.
    ///
    /// Set via SUBDX_METADATA_BASE_URL environment variable.
    #[serde(default = "default_metadata_base_url")]
    pub metadata_base_url: String,

    /// User-Agent string for upstream requests.
    ///
    /// Set via SUBDX_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header sent upstream (avoids IP-based language detection).
    ///
    /// Set via SUBDX_ACCEPT_LANGUAGE environment variable.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Session and search request timeout in milliseconds.
    ///
    /// Set via SUBDX_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Archive download timeout in milliseconds.
    ///
    /// Set via SUBDX_DOWNLOAD_TIMEOUT_MS environment variable.
    #[serde(default = "default_download_timeout_ms")]
    pub download_timeout_ms: u64,

    /// Maximum archive bytes accepted from a download.
    ///
    /// Set via SUBDX_MAX_ARCHIVE_BYTES environment variable.
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: usize,

    /// Maximum inflated size of the extracted subtitle entry.
    ///
    /// Set via SUBDX_MAX_ENTRY_BYTES environment variable.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,

    /// Archive entry extensions accepted as subtitles.
    ///
    /// Set via SUBDX_SUBTITLE_EXTENSIONS environment variable.
    #[serde(default = "default_subtitle_extensions")]
    pub subtitle_extensions: Vec<String>,

    /// TTL for cached title metadata, in seconds.
    ///
    /// Set via SUBDX_TITLE_TTL_SECS environment variable.
    #[serde(default = "default_title_ttl_secs")]
    pub title_ttl_secs: u64,

    /// TTL for cached search results, in seconds.
    ///
    /// Set via SUBDX_SEARCH_TTL_SECS environment variable.
    #[serde(default = "default_search_ttl_secs")]
    pub search_ttl_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./subdx-cache.sqlite")
}

fn default_base_url() -> String {
    "https://www.subdivx.com".into()
}

fn default_metadata_base_url() -> String {
    "https://v3-cinemeta.strem.io".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/107.0.0.0 Safari/537.36"
        .into()
}

fn default_accept_language() -> String {
    "es-AR,es;q=0.9,en;q=0.8".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_download_timeout_ms() -> u64 {
    30_000
}

fn default_max_archive_bytes() -> usize {
    200 * 1024
}

fn default_max_entry_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_subtitle_extensions() -> Vec<String> {
    vec![".srt".into(), ".sub".into(), ".ssa".into()]
}

fn default_title_ttl_secs() -> u64 {
    48 * 60 * 60
}

fn default_search_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            base_url: default_base_url(),
            metadata_base_url: default_metadata_base_url(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            timeout_ms: default_timeout_ms(),
            download_timeout_ms: default_download_timeout_ms(),
            max_archive_bytes: default_max_archive_bytes(),
            max_entry_bytes: default_max_entry_bytes(),
            subtitle_extensions: default_subtitle_extensions(),
            title_ttl_secs: default_title_ttl_secs(),
            search_ttl_secs: default_search_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Session/search timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Download timeout as Duration.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn title_ttl(&self) -> Duration {
        Duration::from_secs(self.title_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SUBDX_`
    /// 2. TOML file from `SUBDX_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SUBDX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SUBDX_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
