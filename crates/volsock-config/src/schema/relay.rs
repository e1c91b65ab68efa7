use serde::{Deserialize, Serialize};

/// Where the relay server lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket URL of the relay server.
    pub url: String,
    /// Give up on a single connect attempt after this many milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8888/ws".into(),
            connect_timeout_ms: 15_000,
        }
    }
}
