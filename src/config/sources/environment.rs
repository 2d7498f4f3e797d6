//! Environment variable source: DRIVENAV__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Shortcut variable for `auth.access_token`
pub const ACCESS_TOKEN_VAR: &str = "DRIVENAV_ACCESS_TOKEN";

/// Add environment variable overlay to builder.
/// Uses DRIVENAV prefix and __ as separator for nested keys
/// (e.g. `DRIVENAV__API__TIMEOUT_SECS`).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("DRIVENAV")
            .separator("__")
            .try_parsing(true),
    );
    let token = std::env::var(ACCESS_TOKEN_VAR)
        .ok()
        .filter(|t| !t.trim().is_empty());
    builder.set_override_option("auth.access_token", token)
}
