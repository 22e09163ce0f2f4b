//! Configuration management for the CLI
//!
//! Sources, lowest priority first: built-in defaults, the optional
//! `~/.config/kdd/config.{json,yaml,toml}` file, then `KDD_*` environment
//! variables. Command-line flags are applied on top in `main`.

use anyhow::{Context, Result};
use kdd_lib::poller::DEFAULT_REFRESH_INTERVAL;
use kdd_lib::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base URL of the dashboard service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Refresh interval for `--watch`, in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_millis() as u64
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            refresh_interval_ms: default_refresh_interval_ms(),
            log_format: default_log_format(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the user config directory and environment
    pub fn load() -> Result<Self> {
        Self::load_from(config_dir().as_deref())
    }

    /// Load configuration, looking for `config.*` inside `dir`
    pub fn load_from(dir: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(dir) = dir {
            builder = builder.add_source(config::File::from(dir.join("config")).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("KDD"))
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Refresh interval; zero falls back to the default
    pub fn refresh_interval(&self) -> Duration {
        if self.refresh_interval_ms == 0 {
            DEFAULT_REFRESH_INTERVAL
        } else {
            Duration::from_millis(self.refresh_interval_ms)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed log format; unknown values fall back to text
    pub fn log_format(&self) -> LogFormat {
        self.log_format.parse().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to text logs");
            LogFormat::Text
        })
    }
}

/// Get the configuration directory
fn config_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("kdd"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = DashboardConfig::load_from(Some(dir.path())).unwrap();

        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "api_url = \"http://dashboard.internal:9000\"\nrefresh_interval_ms = 5000\n",
        )
        .unwrap();

        let config = DashboardConfig::load_from(Some(dir.path())).unwrap();

        assert_eq!(config.api_url, "http://dashboard.internal:9000");
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn test_json_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"log_format": "json", "request_timeout_secs": 5}"#,
        )
        .unwrap();

        let config = DashboardConfig::load_from(Some(dir.path())).unwrap();

        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_interval_falls_back() {
        let config = DashboardConfig {
            refresh_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.refresh_interval(), DEFAULT_REFRESH_INTERVAL);
    }

    #[test]
    fn test_unknown_log_format_falls_back() {
        let config = DashboardConfig {
            log_format: "xml".to_string(),
            ..Default::default()
        };
        assert_eq!(config.log_format(), LogFormat::Text);
    }
}
