//! Death payout orb.

use glam::Vec2;
use protocol::packets::ServerEvent;

/// A collectible orb carrying part of a victim's points.
#[derive(Debug, Clone, PartialEq)]
pub struct Orb {
    pub id: u32,
    pub points: u64,
    pub scale: f32,
    pub position: Vec2,
    /// Not collectible before this timestamp.
    pub enabled_at: u64,
    pub expires_at: u64,
}

impl Orb {
    #[inline]
    pub fn is_enabled(&self, now: u64) -> bool {
        now >= self.enabled_at
    }

    #[inline]
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.scale * 0.5
    }

    pub fn spawn_event(&self) -> ServerEvent {
        ServerEvent::SpawnOrb {
            id: self.id,
            points: self.points,
            scale: self.scale,
            position: self.position,
            enabled_at: self.enabled_at,
        }
    }
}

/// An orb scheduled by a death, spawned once `spawn_at` passes.
///
/// Dropped unspawned when the round it was scheduled in has ended.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrb {
    pub round_id: u64,
    pub spawn_at: u64,
    pub points: u64,
    pub position: Vec2,
}
