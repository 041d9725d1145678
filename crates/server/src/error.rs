//! Error types for the simulation core.

use protocol::ProtocolError;
use thiserror::Error;

/// Input rejections. The offending intent is dropped without any state change.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("Unknown client {0}")]
    UnknownClient(u32),

    #[error("Client is not in play")]
    NotPlaying,

    #[error("Malformed input: {0}")]
    Malformed(#[from] ProtocolError),

    #[error("Point outside the map boundary")]
    OutOfBounds,

    #[error("Reported time is too far behind")]
    HighLatency,

    #[error("No upgrade pending")]
    NoUpgradePending,

    #[error("Invalid upgrade choice {0}")]
    InvalidChoice(usize),

    #[error("Invalid label {0:?}")]
    InvalidLabel(String),

    #[error("Not a moderator")]
    NotAuthorized,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown config key {0:?}")]
    UnknownKey(String),

    #[error("Invalid value {value:?} for {key:?}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to deserialize config: {0}")]
    Deserialize(#[from] toml::de::Error),
}

/// A broken server-side invariant. Raised from the fast tick, always fatal.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Client {id} violates {what}")]
    Invariant { id: u32, what: &'static str },

    #[error("Fast tick panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Encode(#[from] ProtocolError),
}

/// Failures talking to the external realm.
#[derive(Debug, Error)]
pub enum RealmError {
    #[error("Realm is not connected")]
    Offline,
}
