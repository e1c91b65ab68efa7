//! Validation for the relay, reconnect and sync sections.

use crate::schema::VolsockConfig;

use super::helpers::validate_min;

/// Validate the relay endpoint.
pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &VolsockConfig) {
    let url = &config.relay.url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!("relay.url = {url} must use ws:// or wss://"));
    }
    validate_min(
        errors,
        "relay.connect_timeout_ms",
        config.relay.connect_timeout_ms,
        1,
    );
}

/// Validate backoff constraints.
pub(crate) fn validate_reconnect(errors: &mut Vec<String>, config: &VolsockConfig) {
    let r = &config.reconnect;
    validate_min(errors, "reconnect.floor_ms", r.floor_ms, 1);
    validate_min(errors, "reconnect.increment_ms", r.increment_ms, 1);
    if r.cap_ms < r.increment_ms {
        errors.push(format!(
            "reconnect.cap_ms = {} is below reconnect.increment_ms = {}",
            r.cap_ms, r.increment_ms
        ));
    }
    if r.initial_ms > r.cap_ms {
        errors.push(format!(
            "reconnect.initial_ms = {} exceeds reconnect.cap_ms = {}",
            r.initial_ms, r.cap_ms
        ));
    }
}

pub(crate) fn validate_sync(errors: &mut Vec<String>, config: &VolsockConfig) {
    if let Some(group) = &config.sync.group {
        if group.trim().is_empty() {
            errors.push("sync.group must not be empty".into());
        }
    }
}
