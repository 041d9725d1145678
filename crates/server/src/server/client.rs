//! Client session state.

use glam::Vec2;
use protocol::packets::ServerEvent;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use crate::config::Config;
use crate::mechanics::MechanicMap;
use crate::spatial::NearbyCache;

/// Lifecycle state. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    /// Socket accepted, not yet asked to join.
    Connecting,
    /// Admitted, waiting for the first accepted position update.
    Joining,
    Alive,
    /// Killed; watches until it joins again.
    Dead,
    /// Watching by choice or waiting in the admission queue.
    Spectating,
    Disconnected,
}

impl LifeState {
    /// Counts against `max_clients`.
    #[inline]
    pub fn is_admitted(self) -> bool {
        matches!(self, LifeState::Joining | LifeState::Alive)
    }
}

/// Cheat and error counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheatLog {
    pub position_mismatch: u32,
    pub out_of_bounds: u32,
    pub stuck: u32,
    pub collided: u32,
    pub not_really_trying: u32,
    pub too_many_kills: u32,
    pub killing_themselves: u32,
    pub high_latency: u32,
    pub reconnects: u32,
    pub timeouts: u32,
    pub rejected_updates: u32,
}

/// Identity supplied by the transport once the external identity layer has verified it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub address: String,
    pub name: String,
    pub is_mod: bool,
}

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    /// Unique client ID.
    pub id: u32,
    /// Remote address.
    pub address: String,
    pub name: String,
    /// Hash of the network origin, shared by clients behind the same network.
    pub network_hash: String,

    pub state: LifeState,

    /// Server-trusted transform.
    pub position: Vec2,
    pub target: Vec2,
    /// Last claimed transform.
    pub client_position: Vec2,
    pub client_target: Vec2,

    pub xp: f64,
    pub max_hp: f64,
    pub avatar: u8,
    pub speed: f32,
    /// Mode-provided multiplier on the per-stage speed.
    pub base_speed: f32,
    pub override_speed: f32,
    pub override_speed_until: u64,
    pub decay_power: f64,
    pub camera_size: f32,

    pub joined_at: u64,
    /// Server time of the last accepted update.
    pub last_update: u64,
    /// Client clock from the last accepted update.
    pub last_reported_time: u64,
    pub phased_until: u64,
    pub invincible_until: u64,

    pub is_god: bool,
    pub is_mod: bool,
    pub is_stuck: bool,

    pub kills: u32,
    pub deaths: u32,
    pub points: u64,
    pub evolves: u32,
    pub powerups: u32,
    pub orbs: u32,
    pub rewards: u32,
    pub kill_streak: u32,
    pub upgrades_pending: u32,

    /// Network hashes of every victim this round.
    pub kill_log: Vec<String>,
    /// Last contact: (other client, when).
    pub last_touch: Option<(u32, u64)>,

    pub log: CheatLog,
    pub meta: MechanicMap,
    /// Collider candidates for the last cell.
    pub nearby: NearbyCache,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: u32, identity: Identity, config: &Config, now: u64) -> Self {
        let network_hash = network_hash(&identity.address);
        let mut client = Self {
            id,
            address: identity.address,
            name: identity.name,
            network_hash,
            state: LifeState::Connecting,
            position: Vec2::ZERO,
            target: Vec2::ZERO,
            client_position: Vec2::ZERO,
            client_target: Vec2::ZERO,
            xp: 0.0,
            max_hp: config.vitality.max_hp,
            avatar: 0,
            speed: 0.0,
            base_speed: 1.0,
            override_speed: 0.0,
            override_speed_until: 0,
            decay_power: 1.0,
            camera_size: config.vitality.camera_size,
            joined_at: now,
            last_update: now,
            last_reported_time: now,
            phased_until: 0,
            invincible_until: 0,
            is_god: false,
            is_mod: identity.is_mod,
            is_stuck: false,
            kills: 0,
            deaths: 0,
            points: 0,
            evolves: 0,
            powerups: 0,
            orbs: 0,
            rewards: 0,
            kill_streak: 0,
            upgrades_pending: 0,
            kill_log: Vec::new(),
            last_touch: None,
            log: CheatLog::default(),
            meta: MechanicMap::new(),
            nearby: NearbyCache::new(),
        };
        client.reset_vitality(config);
        client
    }

    /// Update activity timestamp.
    pub fn touch(&mut self, now: u64) {
        self.last_update = now;
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state == LifeState::Alive
    }

    #[inline]
    pub fn is_phased(&self, now: u64) -> bool {
        now < self.phased_until
    }

    #[inline]
    pub fn is_invincible(&self, now: u64) -> bool {
        now < self.invincible_until
    }

    /// Speed used for this tick, honoring a live override.
    #[inline]
    pub fn effective_speed(&self, now: u64) -> f32 {
        if now < self.override_speed_until {
            self.override_speed
        } else {
            self.speed
        }
    }

    /// Extend the contact-immunity window.
    pub fn phase(&mut self, now: u64, duration_ms: u64) {
        self.phased_until = self.phased_until.max(now + duration_ms);
    }

    /// Temporary speed change relative to the current stage speed.
    pub fn override_speed_for(&mut self, factor: f32, now: u64, duration_ms: u64) {
        self.override_speed = self.speed * factor;
        self.override_speed_until = now + duration_ms;
    }

    /// Recompute stage speed after an avatar or multiplier change.
    pub fn recompute_speed(&mut self, config: &Config) {
        self.speed = config.vitality.speed_for(self.avatar) * self.base_speed;
    }

    /// Touch radius for the current stage.
    #[inline]
    pub fn touch_radius(&self, config: &Config) -> f32 {
        config.vitality.touch_distance_for(self.avatar)
    }

    /// Back to stage 0 with round-default vitality.
    pub fn reset_vitality(&mut self, config: &Config) {
        self.avatar = 0;
        self.max_hp = config.vitality.max_hp;
        self.xp = config.vitality.start_xp.clamp(0.0, self.max_hp);
        self.base_speed = 1.0;
        self.decay_power = 1.0;
        self.camera_size = config.vitality.camera_size;
        self.override_speed_until = 0;
        self.is_stuck = false;
        self.last_touch = None;
        self.recompute_speed(config);
    }

    /// Zero every round counter.
    pub fn reset_counters(&mut self) {
        self.kills = 0;
        self.deaths = 0;
        self.points = 0;
        self.evolves = 0;
        self.powerups = 0;
        self.orbs = 0;
        self.rewards = 0;
        self.kill_streak = 0;
        self.upgrades_pending = 0;
        self.kill_log.clear();
    }

    /// Place the client, resetting both trusted and claimed transforms.
    pub fn place(&mut self, position: Vec2) {
        self.position = position;
        self.target = position;
        self.client_position = position;
        self.client_target = position;
        self.nearby.mark_dirty();
    }

    pub fn spawn_event(&self) -> ServerEvent {
        ServerEvent::SpawnPlayer {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar,
            position: self.position,
        }
    }

    pub fn update_event(&self, now: u64) -> ServerEvent {
        ServerEvent::UpdatePlayer {
            id: self.id,
            avatar: self.avatar,
            xp: self.xp,
            speed: self.effective_speed(now),
            position: self.position,
            target: self.target,
            phased: self.is_phased(now),
            stuck: self.is_stuck,
        }
    }
}

/// Hash of the network an address belongs to: the /24 for IPv4, the /48 for IPv6.
pub fn network_hash(address: &str) -> String {
    let host = address
        .parse::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| address.parse::<IpAddr>());
    let network = match host {
        Ok(IpAddr::V4(ip)) => {
            let [a, b, c, _] = ip.octets();
            format!("{a}.{b}.{c}")
        }
        Ok(IpAddr::V6(ip)) => {
            let s = ip.segments();
            format!("{:x}:{:x}:{:x}", s[0], s[1], s[2])
        }
        Err(_) => address.to_string(),
    };
    let mut hasher = DefaultHasher::new();
    network.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(address: &str) -> Identity {
        Identity { address: address.into(), name: "tester".into(), is_mod: false }
    }

    #[test]
    fn test_new_client_defaults() {
        let config = Config::default();
        let client = Client::new(1, identity("10.0.0.1:4000"), &config, 100);
        assert_eq!(client.state, LifeState::Connecting);
        assert_eq!(client.avatar, 0);
        assert_eq!(client.xp, config.vitality.start_xp);
        assert_eq!(client.speed, config.vitality.avatar_speed[0]);
    }

    #[test]
    fn test_speed_override_expires() {
        let config = Config::default();
        let mut client = Client::new(1, identity("10.0.0.1"), &config, 0);
        client.override_speed_for(0.5, 1000, 2000);
        assert_eq!(client.effective_speed(1500), client.speed * 0.5);
        assert_eq!(client.effective_speed(3000), client.speed);
    }

    #[test]
    fn test_network_hash_groups_subnet() {
        assert_eq!(network_hash("10.0.0.1:4000"), network_hash("10.0.0.77"));
        assert_ne!(network_hash("10.0.0.1"), network_hash("10.0.1.1"));
        assert_eq!(network_hash("2001:db8:1::5"), network_hash("[2001:db8:1::9]:80"));
    }
}
