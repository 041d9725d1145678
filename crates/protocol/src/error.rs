//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding intents or compiling payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed intent: {0}")]
    MalformedIntent(#[source] serde_json::Error),

    #[error("Invalid point {0:?}, expected \"x:y\"")]
    InvalidPoint(String),

    #[error("Non-finite coordinate in {0:?}")]
    NonFinitePoint(String),

    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}
