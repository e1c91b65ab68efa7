//! Reading `config.toml`, and writing a commented one on first run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use volsock_common::ConfigError;

use crate::schema::VolsockConfig;

/// Written to the default location when no config exists yet. Every key is
/// commented out, so it parses to `VolsockConfig::default()`.
pub(crate) const DEFAULT_TEMPLATE: &str = r##"# VolSock configuration
# Uncomment a key to override it.

[relay]
# url = "ws://localhost:8888/ws"
# connect_timeout_ms = 15000

[reconnect]
# floor_ms = 250         # first retry after a working session dropped
# increment_ms = 5000    # added per consecutive failure
# cap_ms = 30000
# initial_ms = 5000      # delay before the first connection ever succeeds

[sync]
# group = "living-room"  # unset: a random group per run
# announce_on_connect = true
# suppress_echo = true

[logging]
# level = "INFO"         # TRACE, DEBUG, INFO, WARNING, ERROR
"##;

/// `<platform config dir>/volsock/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("volsock").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Parse the file at `path`. Absent keys take their defaults; values are not
/// validated here.
pub fn read_config(path: &Path) -> Result<VolsockConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "{}: {e}",
                path.display()
            )))
        }
    };

    let config = toml::from_str(&text)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), "Config read");
    Ok(config)
}

/// Write [`DEFAULT_TEMPLATE`] to `path`, creating parent directories.
pub fn write_template(path: &Path) -> Result<(), ConfigError> {
    let io_err = |e: std::io::Error| ConfigError::ParseError(format!("{}: {e}", path.display()));

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_TEMPLATE).map_err(io_err)?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}

/// Read `path`, or write the template there and return defaults if it is absent.
pub fn read_or_create(path: &Path) -> Result<VolsockConfig, ConfigError> {
    match read_config(path) {
        Err(ConfigError::FileNotFound(_)) => {
            write_template(path)?;
            Ok(VolsockConfig::default())
        }
        other => other,
    }
}
