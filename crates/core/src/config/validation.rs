//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

const MIN_ARCHIVE_BYTES: usize = 1024;
const MAX_ARCHIVE_BYTES: usize = 512 * 1024;
const MAX_ENTRY_BYTES: usize = 32 * 1024 * 1024;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `base_url` or `metadata_base_url` is not an http(s) URL
    /// - `timeout_ms` / `download_timeout_ms` is below 100ms or above 5 minutes
    /// - `max_archive_bytes` is outside 1 KiB..=512 KiB
    /// - `max_entry_bytes` is 0 or above 32 MiB
    /// - `subtitle_extensions` is empty or contains an entry not starting with `.`
    /// - a TTL is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("base_url", &self.base_url), ("metadata_base_url", &self.metadata_base_url)] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be an http(s) URL".into() });
            }
        }

        for (field, value) in [("timeout_ms", self.timeout_ms), ("download_timeout_ms", self.download_timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if !(MIN_ARCHIVE_BYTES..=MAX_ARCHIVE_BYTES).contains(&self.max_archive_bytes) {
            return Err(ConfigError::Invalid {
                field: "max_archive_bytes".into(),
                reason: "must be between 1KiB and 512KiB".into(),
            });
        }

        if self.max_entry_bytes == 0 || self.max_entry_bytes > MAX_ENTRY_BYTES {
            return Err(ConfigError::Invalid {
                field: "max_entry_bytes".into(),
                reason: "must be between 1 byte and 32MiB".into(),
            });
        }

        if self.subtitle_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "subtitle_extensions".into(),
                reason: "must not be empty".into(),
            });
        }
        if let Some(bad) = self.subtitle_extensions.iter().find(|ext| !ext.starts_with('.') || ext.len() < 2) {
            return Err(ConfigError::Invalid {
                field: "subtitle_extensions".into(),
                reason: format!("'{bad}' must look like '.ext'"),
            });
        }

        if self.title_ttl_secs == 0 || self.search_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "ttl".into(), reason: "must be greater than 0".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_archive_bytes > self.max_entry_bytes {
            tracing::warn!(
                max_archive_bytes = self.max_archive_bytes,
                max_entry_bytes = self.max_entry_bytes,
                "max_entry_bytes is smaller than max_archive_bytes; stored (uncompressed) entries may be rejected"
            );
        }

        Ok(())
    }
}
