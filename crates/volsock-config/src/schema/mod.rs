//! Configuration schema types for VolSock.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod reconnect;
mod relay;
mod sync;
mod system;

pub use reconnect::*;
pub use relay::*;
pub use sync::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VolsockConfig {
    pub relay: RelayConfig,
    pub reconnect: ReconnectConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}
