//! Wire protocol spoken between tabs and the relay.
//!
//! Every frame is a JSON object tagged by `cmd`. Field names are fixed by
//! the relay and must not change.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::id::GroupId;

/// The `type` an `init` carries for volume synchronization.
pub const VOLUME_KIND: &str = "volume";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Message {
    /// Announces which group this connection belongs to.
    Init {
        #[serde(rename = "type")]
        kind: String,
        group: GroupId,
    },
    /// A volume in `[0.0, 1.0]`.
    SetVolume { volume: f64 },
    /// Any `cmd` this side does not understand.
    #[serde(other)]
    Unknown,
}

impl Message {
    pub fn init(group: GroupId) -> Self {
        Self::Init {
            kind: VOLUME_KIND.to_string(),
            group,
        }
    }

    pub fn set_volume(volume: f64) -> Self {
        Self::SetVolume { volume }
    }

    /// Parse one text frame, rejecting volumes outside `[0.0, 1.0]`.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let msg: Self = serde_json::from_str(text)?;
        if let Self::SetVolume { volume } = msg {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ProtocolError::InvalidVolume(volume));
            }
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
