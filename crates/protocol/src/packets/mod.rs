//! Intent and event definitions.
//!
//! This module contains both client->server intents and server->client events.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Longest emote/action/name argument accepted from a client.
pub const MAX_LABEL_LEN: usize = 32;
