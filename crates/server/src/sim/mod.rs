//! Fast-tick resolvers.
//!
//! Each pass is a synchronous method on [`GameState`](crate::server::GameState)
//! run under the single state lock, in this order: movement, combat, pickups,
//! vitality.

mod combat;
mod movement;
mod pickup;
mod vitality;

pub use combat::KillOutcome;
