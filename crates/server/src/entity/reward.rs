//! The singleton reward object.

use glam::Vec2;
use protocol::packets::ServerEvent;
use serde::Serialize;

/// At most one reward lives in the world at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub id: u32,
    pub kind: String,
    pub quantity: u32,
    pub position: Vec2,
    pub enabled_at: u64,
    /// Removed unclaimed at this timestamp.
    pub expires_at: u64,
    /// Address of the claimer, set once claimed.
    pub winner: Option<String>,
}

impl Reward {
    #[inline]
    pub fn is_enabled(&self, now: u64) -> bool {
        now >= self.enabled_at
    }

    #[inline]
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn spawn_event(&self) -> ServerEvent {
        ServerEvent::SpawnReward {
            id: self.id,
            kind: self.kind.clone(),
            quantity: self.quantity,
            position: self.position,
            enabled_at: self.enabled_at,
        }
    }
}

/// A claim recorded on the round for persistence hand-off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardClaim {
    pub reward_id: u32,
    pub address: String,
    pub name: String,
    pub kind: String,
    pub quantity: u32,
    pub claimed_at: u64,
}
