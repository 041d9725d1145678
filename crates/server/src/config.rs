//! Server configuration.
//!
//! The base config is loaded from `config.toml`. Each round runs on a merged
//! snapshot: base, then the `shared` overrides table, then the chosen preset's
//! overrides. Moderation tooling can set single dotted keys live.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::ConfigError;
use crate::mechanics::Mechanic;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub loops: LoopConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub vitality: VitalityConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub pickup: PickupConfig,
    #[serde(default)]
    pub anticheat: AntiCheatConfig,
    #[serde(default)]
    pub rewards: RewardConfig,
    /// Overrides applied to every round before the preset's own.
    #[serde(default)]
    pub shared: toml::Table,
    #[serde(default)]
    pub presets: Vec<PresetConfig>,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Build the snapshot a round runs on: base, then `shared`, then the preset.
    pub fn round_config(&self, preset: Option<&PresetConfig>) -> Result<Config, ConfigError> {
        let mut value = toml::Value::try_from(self)?;
        merge(&mut value, &self.shared);
        if let Some(preset) = preset {
            merge(&mut value, &preset.overrides);
        }
        let mut merged: Config = value.try_into()?;
        if let Some(preset) = preset {
            merged.game.game_mode = preset.game_mode.clone();
        }
        Ok(merged)
    }

    /// Set one dotted key (e.g. `vitality.decay_power`) from a string value.
    ///
    /// Only keys that already exist and hold a scalar can be set, and the
    /// value must parse as the key's current type.
    pub fn set_override(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let mut value = toml::Value::try_from(&*self)?;
        let unknown = || ConfigError::UnknownKey(key.to_string());

        let mut slot = &mut value;
        for part in key.split('.') {
            slot = slot
                .as_table_mut()
                .and_then(|table| table.get_mut(part))
                .ok_or_else(unknown)?;
        }

        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        };
        let parsed = match slot {
            toml::Value::Boolean(_) => toml::Value::Boolean(raw.parse().map_err(|_| invalid())?),
            toml::Value::Integer(_) => toml::Value::Integer(raw.parse().map_err(|_| invalid())?),
            toml::Value::Float(_) => {
                let v: f64 = raw.parse().map_err(|_| invalid())?;
                if !v.is_finite() {
                    return Err(invalid());
                }
                toml::Value::Float(v)
            }
            toml::Value::String(_) => toml::Value::String(raw.to_string()),
            _ => return Err(unknown()),
        };
        *slot = parsed;

        let updated: Config = value.try_into().map_err(|_| invalid())?;
        if !updated.is_playable() {
            return Err(invalid());
        }
        *self = updated;
        Ok(())
    }

    /// Values the simulation cannot run with.
    fn is_playable(&self) -> bool {
        self.vitality.max_evolves > 0
            && self.vitality.max_hp > 0.0
            && self.world.width > 0.0
            && self.world.height > 0.0
            && self.world.grid_cell_size > 0.0
            && self.loops.fast_ms > 0
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge, everything else replaces.
fn merge(base: &mut toml::Value, overlay: &toml::Table) {
    let Some(table) = base.as_table_mut() else {
        return;
    };
    for (key, value) in overlay {
        match (table.get_mut(key), value) {
            (Some(existing @ toml::Value::Table(_)), toml::Value::Table(inner)) => merge(existing, inner),
            _ => {
                table.insert(key.clone(), value.clone());
            }
        }
    }
}

/// A named bundle of overrides defining a game mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresetConfig {
    pub name: String,
    pub game_mode: String,
    #[serde(default)]
    pub overrides: toml::Table,
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port for the HTTP status endpoint.
    #[serde(default = "default_status_port")]
    pub status_port: u16,
    /// Maximum socket connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Server name shown to clients.
    #[serde(default = "default_name")]
    pub name: String,
    /// Fixed RNG seed. Leave unset for an OS-seeded generator.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            status_port: default_status_port(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            name: default_name(),
            seed: None,
        }
    }
}

fn default_port() -> u16 {
    11443
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_status_port() -> u16 {
    11444
}
fn default_max_connections() -> usize {
    200
}
fn default_ip_limit() -> usize {
    10
}
fn default_name() -> String {
    "Isles".to_string()
}

/// Loop periods and cadences, all in milliseconds unless stated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoopConfig {
    #[serde(default = "default_fast_ms")]
    pub fast_ms: u64,
    #[serde(default = "default_slow_ms")]
    pub slow_ms: u64,
    #[serde(default = "default_connection_check_ms")]
    pub connection_check_ms: u64,
    #[serde(default = "default_reward_spawn_ms")]
    pub reward_spawn_ms: u64,
    #[serde(default = "default_leaderboard_ms")]
    pub leaderboard_ms: u64,
    /// Minimum gap between two broadcast flushes.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_round_loop_seconds")]
    pub round_loop_seconds: u64,
    /// Delay between a disconnect broadcast and socket teardown.
    #[serde(default = "default_teardown_delay_ms")]
    pub teardown_delay_ms: u64,
    /// Minimum gap between two recorded player updates in the round log.
    #[serde(default = "default_update_record_interval_ms")]
    pub update_record_interval_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fast_ms: default_fast_ms(),
            slow_ms: default_slow_ms(),
            connection_check_ms: default_connection_check_ms(),
            reward_spawn_ms: default_reward_spawn_ms(),
            leaderboard_ms: default_leaderboard_ms(),
            flush_interval_ms: default_flush_interval_ms(),
            round_loop_seconds: default_round_loop_seconds(),
            teardown_delay_ms: default_teardown_delay_ms(),
            update_record_interval_ms: default_update_record_interval_ms(),
        }
    }
}

fn default_fast_ms() -> u64 {
    40
}
fn default_slow_ms() -> u64 {
    1000
}
fn default_connection_check_ms() -> u64 {
    1000
}
fn default_reward_spawn_ms() -> u64 {
    30_000
}
fn default_leaderboard_ms() -> u64 {
    2000
}
fn default_flush_interval_ms() -> u64 {
    80
}
fn default_round_loop_seconds() -> u64 {
    600
}
fn default_teardown_delay_ms() -> u64 {
    1000
}
fn default_update_record_interval_ms() -> u64 {
    500
}

/// An axis-aligned static collider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColliderConfig {
    /// Name prefix selects the policy: `Land*`, `Island*`, `Collider*`, `Level2Divider*`.
    pub name: String,
    pub min: Vec2,
    pub max: Vec2,
}

/// Map geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: f32,
    #[serde(default = "default_world_size")]
    pub height: f32,
    /// Spatial grid cell size.
    #[serde(default = "default_grid_cell_size")]
    pub grid_cell_size: f32,
    #[serde(default)]
    pub colliders: Vec<ColliderConfig>,
    /// Empty means a random free point inside the boundary.
    #[serde(default)]
    pub spawn_points: Vec<Vec2>,
    #[serde(default)]
    pub reward_spawn_points: Vec<Vec2>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
            grid_cell_size: default_grid_cell_size(),
            colliders: Vec::new(),
            spawn_points: Vec::new(),
            reward_spawn_points: Vec::new(),
        }
    }
}

fn default_world_size() -> f32 {
    100.0
}
fn default_grid_cell_size() -> f32 {
    5.0
}

/// An upgrade offered after an evolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpgradeConfig {
    pub name: String,
    pub mechanic: Mechanic,
    pub value: f64,
}

/// Round-level rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameConfig {
    #[serde(default = "default_game_mode")]
    pub game_mode: String,
    /// Cap on joining plus alive clients; the rest queue.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// After joining, starvation is not honored for this long.
    #[serde(default = "default_immunity_seconds")]
    pub immunity_seconds: u64,
    /// Spawn invincibility.
    #[serde(default = "default_spawn_invincibility_ms")]
    pub spawn_invincibility_ms: u64,
    /// Nobody can die.
    #[serde(default)]
    pub god_party: bool,
    #[serde(default)]
    pub sticky_islands: bool,
    #[serde(default = "default_players_required_for_level2")]
    pub players_required_for_level2: usize,
    #[serde(default = "default_points_per_evolve")]
    pub points_per_evolve: u64,
    #[serde(default = "default_points_per_kill")]
    pub points_per_kill: u64,
    #[serde(default = "default_points_per_sprite")]
    pub points_per_sprite: u64,
    #[serde(default = "default_points_per_reward")]
    pub points_per_reward: u64,
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
    #[serde(default = "default_upgrades_enabled")]
    pub upgrades_enabled: bool,
    #[serde(default = "default_upgrades")]
    pub upgrades: Vec<UpgradeConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_mode: default_game_mode(),
            max_clients: default_max_clients(),
            immunity_seconds: default_immunity_seconds(),
            spawn_invincibility_ms: default_spawn_invincibility_ms(),
            god_party: false,
            sticky_islands: false,
            players_required_for_level2: default_players_required_for_level2(),
            points_per_evolve: default_points_per_evolve(),
            points_per_kill: default_points_per_kill(),
            points_per_sprite: default_points_per_sprite(),
            points_per_reward: default_points_per_reward(),
            leaderboard_size: default_leaderboard_size(),
            upgrades_enabled: default_upgrades_enabled(),
            upgrades: default_upgrades(),
        }
    }
}

fn default_game_mode() -> String {
    "Standard".to_string()
}
fn default_max_clients() -> usize {
    100
}
fn default_immunity_seconds() -> u64 {
    5
}
fn default_spawn_invincibility_ms() -> u64 {
    2000
}
fn default_players_required_for_level2() -> usize {
    8
}
fn default_points_per_evolve() -> u64 {
    10
}
fn default_points_per_kill() -> u64 {
    20
}
fn default_points_per_sprite() -> u64 {
    1
}
fn default_points_per_reward() -> u64 {
    50
}
fn default_leaderboard_size() -> usize {
    10
}
fn default_upgrades_enabled() -> bool {
    true
}
fn default_upgrades() -> Vec<UpgradeConfig> {
    vec![
        UpgradeConfig {
            name: "Slow Metabolism".to_string(),
            mechanic: Mechanic::DecayDecreasePercent,
            value: 10.0,
        },
        UpgradeConfig {
            name: "Sweet Tooth".to_string(),
            mechanic: Mechanic::SpriteValueIncreasePercent,
            value: 15.0,
        },
        UpgradeConfig {
            name: "Second Wind".to_string(),
            mechanic: Mechanic::EvolveSpeedBurstPercent,
            value: 25.0,
        },
    ]
}

/// Per-stage vitality tables and decay settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VitalityConfig {
    /// Number of avatar stages.
    #[serde(default = "default_max_evolves")]
    pub max_evolves: u8,
    #[serde(default = "default_max_hp")]
    pub max_hp: f64,
    #[serde(default = "default_start_xp")]
    pub start_xp: f64,
    /// Movement speed per stage, in units per second.
    #[serde(default = "default_avatar_speed")]
    pub avatar_speed: Vec<f32>,
    #[serde(default = "default_avatar_decay_power")]
    pub avatar_decay_power: Vec<f64>,
    /// Touch radius per stage.
    #[serde(default = "default_avatar_touch_distance")]
    pub avatar_touch_distance: Vec<f32>,
    /// Global decay multiplier. Recomputed by the slow loop when dynamic.
    #[serde(default = "default_decay_power")]
    pub decay_power: f64,
    #[serde(default)]
    pub dynamic_decay_power: bool,
    #[serde(default = "default_decay_power_per_max_evolved")]
    pub decay_power_per_max_evolved: f64,
    #[serde(default)]
    pub no_decay: bool,
    #[serde(default = "default_evolve_burst_ms")]
    pub evolve_burst_ms: u64,
    #[serde(default = "default_camera_size")]
    pub camera_size: f32,
}

impl Default for VitalityConfig {
    fn default() -> Self {
        Self {
            max_evolves: default_max_evolves(),
            max_hp: default_max_hp(),
            start_xp: default_start_xp(),
            avatar_speed: default_avatar_speed(),
            avatar_decay_power: default_avatar_decay_power(),
            avatar_touch_distance: default_avatar_touch_distance(),
            decay_power: default_decay_power(),
            dynamic_decay_power: false,
            decay_power_per_max_evolved: default_decay_power_per_max_evolved(),
            no_decay: false,
            evolve_burst_ms: default_evolve_burst_ms(),
            camera_size: default_camera_size(),
        }
    }
}

impl VitalityConfig {
    pub fn speed_for(&self, avatar: u8) -> f32 {
        stage_value(&self.avatar_speed, avatar).unwrap_or(1.0)
    }

    pub fn decay_power_for(&self, avatar: u8) -> f64 {
        stage_value(&self.avatar_decay_power, avatar).unwrap_or(1.0)
    }

    pub fn touch_distance_for(&self, avatar: u8) -> f32 {
        stage_value(&self.avatar_touch_distance, avatar).unwrap_or(0.5)
    }

    /// Highest reachable stage.
    pub fn max_stage(&self) -> u8 {
        self.max_evolves.saturating_sub(1)
    }
}

/// Tables shorter than `max_evolves` repeat their last entry.
fn stage_value<T: Copy>(table: &[T], avatar: u8) -> Option<T> {
    table.get(avatar as usize).or_else(|| table.last()).copied()
}

fn default_max_evolves() -> u8 {
    9
}
fn default_max_hp() -> f64 {
    100.0
}
fn default_start_xp() -> f64 {
    50.0
}
fn default_avatar_speed() -> Vec<f32> {
    vec![3.0, 3.1, 3.2, 3.3, 3.4, 3.5, 3.4, 3.3, 3.2]
}
fn default_avatar_decay_power() -> Vec<f64> {
    vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5]
}
fn default_avatar_touch_distance() -> Vec<f32> {
    vec![0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 1.2]
}
fn default_decay_power() -> f64 {
    1.0
}
fn default_decay_power_per_max_evolved() -> f64 {
    0.1
}
fn default_evolve_burst_ms() -> u64 {
    2000
}
fn default_camera_size() -> f32 {
    1.0
}

/// Contact and death settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CombatConfig {
    #[serde(default = "default_damage_per_touch")]
    pub damage_per_touch: f64,
    #[serde(default = "default_kill_xp_bonus")]
    pub kill_xp_bonus: f64,
    #[serde(default = "default_orb_on_death_percent")]
    pub orb_on_death_percent: f64,
    /// Delay before a death orb appears, and again before it can be collected.
    #[serde(default = "default_orb_timeout_ms")]
    pub orb_timeout_ms: u64,
    #[serde(default = "default_orb_scale")]
    pub orb_scale: f32,
    /// Time a collectible orb stays in the world.
    #[serde(default = "default_orb_lifetime_ms")]
    pub orb_lifetime_ms: u64,
    #[serde(default = "default_true")]
    pub prevent_bad_kills: bool,
    #[serde(default = "default_touch_slowdown_ms")]
    pub touch_slowdown_ms: u64,
    #[serde(default = "default_touch_slowdown_factor")]
    pub touch_slowdown_factor: f32,
    /// A starving client dies by the last toucher if touched within this window.
    #[serde(default = "default_last_touch_window_ms")]
    pub last_touch_window_ms: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            damage_per_touch: default_damage_per_touch(),
            kill_xp_bonus: default_kill_xp_bonus(),
            orb_on_death_percent: default_orb_on_death_percent(),
            orb_timeout_ms: default_orb_timeout_ms(),
            orb_scale: default_orb_scale(),
            orb_lifetime_ms: default_orb_lifetime_ms(),
            prevent_bad_kills: true,
            touch_slowdown_ms: default_touch_slowdown_ms(),
            touch_slowdown_factor: default_touch_slowdown_factor(),
            last_touch_window_ms: default_last_touch_window_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_damage_per_touch() -> f64 {
    5.0
}
fn default_kill_xp_bonus() -> f64 {
    25.0
}
fn default_orb_on_death_percent() -> f64 {
    25.0
}
fn default_orb_timeout_ms() -> u64 {
    2000
}
fn default_orb_scale() -> f32 {
    1.0
}
fn default_orb_lifetime_ms() -> u64 {
    60_000
}
fn default_touch_slowdown_ms() -> u64 {
    2000
}
fn default_touch_slowdown_factor() -> f32 {
    0.5
}
fn default_last_touch_window_ms() -> u64 {
    2000
}

/// Sprite pool and pickup settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PickupConfig {
    #[serde(default = "default_pickup_distance")]
    pub pickup_distance: f32,
    #[serde(default = "default_sprites_start_count")]
    pub sprites_start_count: usize,
    #[serde(default = "default_sprites_per_client")]
    pub sprites_per_client: usize,
    /// Xp per sprite type (0..3).
    #[serde(default = "default_sprite_xp")]
    pub sprite_xp: [f64; 4],
    #[serde(default = "default_sprite_xp_multiplier")]
    pub sprite_xp_multiplier: f64,
    #[serde(default = "default_sprite_scale")]
    pub sprite_scale: f32,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            pickup_distance: default_pickup_distance(),
            sprites_start_count: default_sprites_start_count(),
            sprites_per_client: default_sprites_per_client(),
            sprite_xp: default_sprite_xp(),
            sprite_xp_multiplier: default_sprite_xp_multiplier(),
            sprite_scale: default_sprite_scale(),
        }
    }
}

fn default_pickup_distance() -> f32 {
    0.5
}
fn default_sprites_start_count() -> usize {
    20
}
fn default_sprites_per_client() -> usize {
    3
}
fn default_sprite_xp() -> [f64; 4] {
    [2.0, 4.0, 8.0, 16.0]
}
fn default_sprite_xp_multiplier() -> f64 {
    1.0
}
fn default_sprite_scale() -> f32 {
    0.5
}

/// Cheat detection toggles and thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AntiCheatConfig {
    /// Allowed divergence between server and claimed position.
    #[serde(default = "default_check_position_distance")]
    pub check_position_distance: f32,
    #[serde(default)]
    pub disconnect_on_position_mismatch: bool,
    #[serde(default = "default_position_mismatch_limit")]
    pub position_mismatch_limit: u32,
    #[serde(default)]
    pub disconnect_on_high_latency: bool,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// Clients silent for longer than this are disconnected.
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub anti_feed_not_trying: bool,
    #[serde(default = "default_true")]
    pub anti_feed_kill_rate: bool,
    #[serde(default = "default_true")]
    pub anti_feed_self_hash: bool,
    #[serde(default = "default_too_many_kills_threshold")]
    pub too_many_kills_threshold: usize,
    #[serde(default = "default_true")]
    pub same_client_cant_claim_reward_twice_in_row: bool,
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: usize,
    #[serde(default = "default_reconnect_window_seconds")]
    pub reconnect_window_seconds: u64,
}

impl Default for AntiCheatConfig {
    fn default() -> Self {
        Self {
            check_position_distance: default_check_position_distance(),
            disconnect_on_position_mismatch: false,
            position_mismatch_limit: default_position_mismatch_limit(),
            disconnect_on_high_latency: false,
            max_latency_ms: default_max_latency_ms(),
            client_timeout_ms: default_client_timeout_ms(),
            anti_feed_not_trying: true,
            anti_feed_kill_rate: true,
            anti_feed_self_hash: true,
            too_many_kills_threshold: default_too_many_kills_threshold(),
            same_client_cant_claim_reward_twice_in_row: true,
            max_reconnects: default_max_reconnects(),
            reconnect_window_seconds: default_reconnect_window_seconds(),
        }
    }
}

fn default_check_position_distance() -> f32 {
    2.0
}
fn default_position_mismatch_limit() -> u32 {
    50
}
fn default_max_latency_ms() -> u64 {
    2000
}
fn default_client_timeout_ms() -> u64 {
    20_000
}
fn default_too_many_kills_threshold() -> usize {
    5
}
fn default_max_reconnects() -> usize {
    5
}
fn default_reconnect_window_seconds() -> u64 {
    60
}

/// Reward spawning. Economy values may be replaced by the realm after each round.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reward_kind")]
    pub kind: String,
    #[serde(default = "default_reward_quantity")]
    pub quantity: u32,
    /// Time between spawning and becoming collectible.
    #[serde(default = "default_reward_enable_delay_ms")]
    pub enable_delay_ms: u64,
    /// Time an unclaimed reward holds the slot once collectible.
    #[serde(default = "default_reward_lifetime_ms")]
    pub lifetime_ms: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: default_reward_kind(),
            quantity: default_reward_quantity(),
            enable_delay_ms: default_reward_enable_delay_ms(),
            lifetime_ms: default_reward_lifetime_ms(),
        }
    }
}

fn default_reward_kind() -> String {
    "token".to_string()
}
fn default_reward_quantity() -> u32 {
    1
}
fn default_reward_enable_delay_ms() -> u64 {
    3000
}
fn default_reward_lifetime_ms() -> u64 {
    120_000
}
