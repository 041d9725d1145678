//! Client -> Server intent decoding.

use serde::Deserialize;

use crate::ProtocolError;

/// A decoded, already-authenticated client intent.
///
/// Wire shape: `{"method": "updateMyself", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum ClientIntent {
    /// Request to enter play (or the admission queue).
    Join,
    /// Leave play and watch.
    Spectate,
    /// Claimed position/target; both are `x:y` strings.
    UpdateMyself {
        position: String,
        target: String,
        /// Client clock in epoch milliseconds.
        time: u64,
    },
    /// Full state synchronisation request.
    Load,
    ChooseUpgrade { choice: usize },
    Emote { name: String },
    Action { name: String },
    /// Moderation tooling. Authorization happens upstream, the core only checks `is_mod`.
    Moderate(ModCommand),
}

impl ClientIntent {
    /// Parse an intent from a raw text or binary frame.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::MalformedIntent)
    }
}

/// Moderation commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ModCommand {
    /// Set a dotted config key, e.g. `vitality.decay_power`.
    SetConfig { key: String, value: String },
    Kick { client_id: u32 },
    RotateRound,
    Broadcast { message: String },
    ToggleGod { client_id: u32 },
}
