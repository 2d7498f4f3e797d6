//! Configuration
//!
//! Layered configuration loaded with the `config` crate. Precedence, lowest to
//! highest: built-in defaults, global file, explicit `--config` file,
//! `DRIVENAV__*` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;

use crate::error::DriveError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub drive: NavigationConfig,
    pub download: DownloadConfig,
    pub logging: LoggingConfig,
}

/// Remote API endpoint and transport limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Entries requested per listing page; None lets the server decide
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.microsoft.com/v1.0".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            page_size: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Where the bearer token comes from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Token server URL answering GET with `{"access_token": ...}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Display name of the synthetic root folder
    pub root_name: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            root_name: "OneDrive".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl DownloadConfig {
    /// Configured directory, else the user's download dir, else the working directory
    pub fn resolve_directory(&self) -> PathBuf {
        if let Some(dir) = &self.directory {
            return dir.clone();
        }
        directories::UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(|d| d.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn has_http_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl DriveConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), DriveError> {
        if !has_http_scheme(&self.api.base_url) {
            return Err(DriveError::ConfigError(format!(
                "api.base_url must be an http(s) URL, got {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 || self.api.connect_timeout_secs == 0 {
            return Err(DriveError::ConfigError(
                "api timeouts must be greater than zero".to_string(),
            ));
        }
        if let Some(endpoint) = &self.auth.token_endpoint {
            if !has_http_scheme(endpoint) {
                return Err(DriveError::ConfigError(format!(
                    "auth.token_endpoint must be an http(s) URL, got {}",
                    endpoint
                )));
            }
        }
        if self.drive.root_name.trim().is_empty() {
            return Err(DriveError::ConfigError(
                "drive.root_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy safe to print: the access token is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth.access_token.is_some() {
            copy.auth.access_token = Some("<redacted>".to_string());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, DriveError> {
        toml::to_string_pretty(self)
            .map_err(|e| DriveError::ConfigError(format!("Failed to serialize config: {}", e)))
    }
}
