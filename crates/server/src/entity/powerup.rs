//! Sprite pickup.

use glam::Vec2;
use protocol::packets::ServerEvent;

/// Number of sprite types.
pub const SPRITE_KINDS: u8 = 4;

/// An ambient sprite, constantly replenished to hold the pool size.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub id: u32,
    /// Sprite type, `0..SPRITE_KINDS`.
    pub kind: u8,
    pub position: Vec2,
    pub scale: f32,
}

impl PowerUp {
    pub fn new(id: u32, kind: u8, position: Vec2, scale: f32) -> Self {
        Self {
            id,
            kind: kind % SPRITE_KINDS,
            position,
            scale,
        }
    }

    /// Pickup radius contributed by the sprite itself.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.scale * 0.5
    }

    pub fn spawn_event(&self) -> ServerEvent {
        ServerEvent::SpawnPowerUp {
            id: self.id,
            kind: self.kind,
            position: self.position,
            scale: self.scale,
        }
    }
}
