//! Shared protocol crate for the isles arena server.
//!
//! This crate contains:
//! - Inbound intent decoding (`{"method": .., "params": ..}`)
//! - The outbound event catalog
//! - The payload compiler producing `{"type":"events","data":[[name,args],..]}`
//! - `x:y` point parsing

mod codec;
mod error;
pub mod packets;

pub use codec::{PayloadWriter, compile, format_num, format_point, parse_point};
pub use error::ProtocolError;

/// Represents a 2D position using glam's Vec2.
pub type Position = glam::Vec2;
