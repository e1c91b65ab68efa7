//! VolSock configuration.
//!
//! One TOML file with four sections. Every key has a default, so a partial
//! file (or none at all) works. Values are checked by [`validation::validate`]
//! after parsing.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::default_config_path;
pub use schema::{
    LogLevel, LoggingConfig, ReconnectConfig, RelayConfig, SyncConfig, VolsockConfig,
};

use std::path::Path;

use tracing::info;
use volsock_common::ConfigError;

/// Load and validate the config at the platform default path, writing a
/// commented template there first if none exists.
pub fn load_config() -> Result<VolsockConfig, ConfigError> {
    let path = default_config_path()?;
    let config = loader::read_or_create(&path)?;
    validation::validate(&config)?;
    info!(path = %path.display(), "Config loaded");
    Ok(config)
}

/// Load and validate the config at `path`. The file must exist.
pub fn load_config_from(path: &Path) -> Result<VolsockConfig, ConfigError> {
    let config = loader::read_config(path)?;
    validation::validate(&config)?;
    info!(path = %path.display(), "Config loaded");
    Ok(config)
}

/// Pretty JSON dump of a config.
pub fn config_to_json(config: &VolsockConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
