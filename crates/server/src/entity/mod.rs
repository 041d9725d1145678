//! World objects.
//!
//! Sprites, death orbs, the singleton reward and static map colliders.

mod collider;
mod orb;
mod powerup;
mod reward;

pub use collider::{ColliderKind, StaticCollider};
pub use orb::{Orb, PendingOrb};
pub use powerup::{PowerUp, SPRITE_KINDS};
pub use reward::{Reward, RewardClaim};
