//! Reconnect backoff settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff applied between reconnect attempts.
///
/// The first reconnect after a successful session waits `floor_ms`; each
/// further consecutive failure waits `increment_ms` longer, up to `cap_ms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectConfig {
    pub floor_ms: u64,
    pub increment_ms: u64,
    pub cap_ms: u64,
    /// Retry delay before the first connection ever succeeds.
    pub initial_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            floor_ms: 250,
            increment_ms: 5_000,
            cap_ms: 30_000,
            initial_ms: 5_000,
        }
    }
}

impl ReconnectConfig {
    pub fn floor(&self) -> Duration {
        Duration::from_millis(self.floor_ms)
    }

    pub fn increment(&self) -> Duration {
        Duration::from_millis(self.increment_ms)
    }

    pub fn cap(&self) -> Duration {
        Duration::from_millis(self.cap_ms)
    }

    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }
}
