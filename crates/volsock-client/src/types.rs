//! Connection state, event and effect enums for the sync client.

use std::time::Duration;

use volsock_common::Message;
use volsock_config::SyncConfig;

use crate::surface::SurfaceId;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Behavior switches taken from the `[sync]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Send each surface's current volume right after `init`.
    pub announce_on_connect: bool,
    /// Do not re-send the change event caused by applying a remote volume.
    pub suppress_echo: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            announce_on_connect: config.announce_on_connect,
            suppress_echo: config.suppress_echo,
        }
    }
}

// ---------------------------------------------------------------------------
// Events & Effects
// ---------------------------------------------------------------------------

/// Everything that can happen to a sync client, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Start-up, or the pending reconnect timer fired.
    ConnectRequested,
    /// The socket finished its handshake.
    Opened,
    /// The socket closed or never opened.
    Closed,
    /// A text frame arrived from the relay.
    Message(String),
    /// A surface reported a new volume.
    LocalVolumeChanged { surface: SurfaceId, volume: f64 },
}

/// Work the driver must carry out on the client's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a new socket to the relay.
    Connect,
    /// Write a frame to the open socket.
    Send(Message),
    /// Arm the reconnect timer; fire `ConnectRequested` after the delay.
    ScheduleReconnect(Duration),
}
