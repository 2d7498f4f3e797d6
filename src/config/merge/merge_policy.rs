//! Merge policy: built-in defaults form the lowest layer.

use crate::config::DriveConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with `DriveConfig::default()` so partial files deserialize.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&DriveConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
