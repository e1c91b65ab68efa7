//! Full configuration validation.
//!
//! Each section has a validator; this orchestrator calls them all and
//! collects errors into a single `ConfigError`.

mod connection;
mod helpers;


use crate::schema::VolsockConfig;
use volsock_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &VolsockConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    connection::validate_relay(&mut errors, config);
    connection::validate_reconnect(&mut errors, config);
    connection::validate_sync(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
