use serde::{Deserialize, Serialize};

/// Volume synchronization behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Fixed group to join. When unset a random group is generated per run.
    pub group: Option<String>,
    /// Send every surface's current volume right after `init`.
    pub announce_on_connect: bool,
    /// Swallow the local change event raised by applying a remote volume.
    pub suppress_echo: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            group: None,
            announce_on_connect: true,
            suppress_echo: true,
        }
    }
}
