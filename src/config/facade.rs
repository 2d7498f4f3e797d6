//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::paths::xdg_root;
use super::DriveConfig;
use crate::error::DriveError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults, the global file, an optional explicit
    /// file and the environment, then validate it.
    pub fn load(config_path: Option<&Path>) -> Result<DriveConfig, DriveError> {
        let config = MergeService::load(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Create default configuration.
    pub fn default() -> DriveConfig {
        DriveConfig::default()
    }

    /// Path of the global config file (~/.config/drivenav/config.toml)
    pub fn global_config_path() -> Result<PathBuf, DriveError> {
        xdg_root::global_config_path()
    }

    /// Write the default configuration to `path`; refuses to overwrite unless `force`
    pub fn write_default(path: &Path, force: bool) -> Result<PathBuf, DriveError> {
        if path.exists() && !force {
            return Err(DriveError::ConfigError(format!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, DriveConfig::default().to_toml()?)?;
        info!(path = %path.display(), "Wrote default configuration");
        Ok(path.to_path_buf())
    }
}
