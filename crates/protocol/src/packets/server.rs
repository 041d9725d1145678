//! Server -> Client event catalog.

use glam::Vec2;

use crate::codec::{format_num, format_point};

/// What a client picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Sprite,
    Orb,
}

impl PickupKind {
    fn as_str(self) -> &'static str {
        match self {
            PickupKind::Sprite => "sprite",
            PickupKind::Orb => "orb",
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub id: u32,
    pub name: String,
    pub points: u64,
}

/// Outbound events. Each serializes as `[name(), args().join(":")]`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SpawnPlayer { id: u32, name: String, avatar: u8, position: Vec2 },
    UpdatePlayer {
        id: u32,
        avatar: u8,
        xp: f64,
        speed: f32,
        position: Vec2,
        target: Vec2,
        phased: bool,
        stuck: bool,
    },
    Disconnected { id: u32, reason: String },
    SpawnPowerUp { id: u32, kind: u8, position: Vec2, scale: f32 },
    RemovePowerUp { id: u32 },
    SpawnOrb { id: u32, points: u64, scale: f32, position: Vec2, enabled_at: u64 },
    RemoveOrb { id: u32 },
    UpdatePickup { client_id: u32, pickup_id: u32, kind: PickupKind, value: f64 },
    SpawnReward { id: u32, kind: String, quantity: u32, position: Vec2, enabled_at: u64 },
    RemoveReward { id: u32 },
    RewardWinner { client_id: u32, name: String, reward_id: u32, quantity: u32 },
    UpdateEvolution { id: u32, avatar: u8, speed: f32 },
    UpdateRegression { id: u32, avatar: u8, speed: f32 },
    GameOver { loser: u32, winner: u32 },
    SetRoundInfo { round_id: u64, game_mode: String, started_at: u64, ends_at: u64 },
    RoundWinner { round_id: u64, name: String, points: u64 },
    ClearLeaderboard,
    Leaderboard { rows: Vec<LeaderboardRow> },
    UpdateBestClient { id: u32, name: String, points: u64 },
    Broadcast { message: String, notice: bool },
    Spectate { id: u32 },
    Queued { position: usize },
    JoinGame { id: u32, position: Vec2 },
    Emote { id: u32, name: String },
    Action { id: u32, name: String },
    UpgradeChosen { id: u32, choice: usize },
    Level2Changed { open: bool },
}

impl ServerEvent {
    /// Event name as delivered to clients.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SpawnPlayer { .. } => "onSpawnPlayer",
            ServerEvent::UpdatePlayer { .. } => "onUpdatePlayer",
            ServerEvent::Disconnected { .. } => "onDisconnected",
            ServerEvent::SpawnPowerUp { .. } => "onSpawnPowerUp",
            ServerEvent::RemovePowerUp { .. } => "onRemovePowerUp",
            ServerEvent::SpawnOrb { .. } => "onSpawnOrb",
            ServerEvent::RemoveOrb { .. } => "onRemoveOrb",
            ServerEvent::UpdatePickup { .. } => "onUpdatePickup",
            ServerEvent::SpawnReward { .. } => "onSpawnReward",
            ServerEvent::RemoveReward { .. } => "onRemoveReward",
            ServerEvent::RewardWinner { .. } => "onRewardWinner",
            ServerEvent::UpdateEvolution { .. } => "onUpdateEvolution",
            ServerEvent::UpdateRegression { .. } => "onUpdateRegression",
            ServerEvent::GameOver { .. } => "onGameOver",
            ServerEvent::SetRoundInfo { .. } => "onSetRoundInfo",
            ServerEvent::RoundWinner { .. } => "onRoundWinner",
            ServerEvent::ClearLeaderboard => "onClearLeaderboard",
            ServerEvent::Leaderboard { .. } => "onLeaderboard",
            ServerEvent::UpdateBestClient { .. } => "onUpdateBestClient",
            ServerEvent::Broadcast { .. } => "onBroadcast",
            ServerEvent::Spectate { .. } => "onSpectate",
            ServerEvent::Queued { .. } => "onQueued",
            ServerEvent::JoinGame { .. } => "onJoinGame",
            ServerEvent::Emote { .. } => "onEmote",
            ServerEvent::Action { .. } => "onAction",
            ServerEvent::UpgradeChosen { .. } => "onUpgradeChosen",
            ServerEvent::Level2Changed { .. } => "onLevel2Changed",
        }
    }

    /// Positional arguments. Points are written as `x:y` and so occupy two positions.
    pub fn args(&self) -> Vec<String> {
        match self {
            ServerEvent::SpawnPlayer { id, name, avatar, position } => {
                vec![id.to_string(), sanitize(name), avatar.to_string(), format_point(*position)]
            }
            ServerEvent::UpdatePlayer { id, avatar, xp, speed, position, target, phased, stuck } => vec![
                id.to_string(),
                avatar.to_string(),
                format_num(*xp as f32),
                format_num(*speed),
                format_point(*position),
                format_point(*target),
                flag(*phased),
                flag(*stuck),
            ],
            ServerEvent::Disconnected { id, reason } => vec![id.to_string(), sanitize(reason)],
            ServerEvent::SpawnPowerUp { id, kind, position, scale } => {
                vec![id.to_string(), kind.to_string(), format_point(*position), format_num(*scale)]
            }
            ServerEvent::RemovePowerUp { id } | ServerEvent::RemoveOrb { id } | ServerEvent::RemoveReward { id } => {
                vec![id.to_string()]
            }
            ServerEvent::SpawnOrb { id, points, scale, position, enabled_at } => vec![
                id.to_string(),
                points.to_string(),
                format_num(*scale),
                format_point(*position),
                enabled_at.to_string(),
            ],
            ServerEvent::UpdatePickup { client_id, pickup_id, kind, value } => vec![
                client_id.to_string(),
                pickup_id.to_string(),
                kind.as_str().to_string(),
                format_num(*value as f32),
            ],
            ServerEvent::SpawnReward { id, kind, quantity, position, enabled_at } => vec![
                id.to_string(),
                sanitize(kind),
                quantity.to_string(),
                format_point(*position),
                enabled_at.to_string(),
            ],
            ServerEvent::RewardWinner { client_id, name, reward_id, quantity } => vec![
                client_id.to_string(),
                sanitize(name),
                reward_id.to_string(),
                quantity.to_string(),
            ],
            ServerEvent::UpdateEvolution { id, avatar, speed }
            | ServerEvent::UpdateRegression { id, avatar, speed } => {
                vec![id.to_string(), avatar.to_string(), format_num(*speed)]
            }
            ServerEvent::GameOver { loser, winner } => vec![loser.to_string(), winner.to_string()],
            ServerEvent::SetRoundInfo { round_id, game_mode, started_at, ends_at } => vec![
                round_id.to_string(),
                sanitize(game_mode),
                started_at.to_string(),
                ends_at.to_string(),
            ],
            ServerEvent::RoundWinner { round_id, name, points } => {
                vec![round_id.to_string(), sanitize(name), points.to_string()]
            }
            ServerEvent::ClearLeaderboard => Vec::new(),
            ServerEvent::Leaderboard { rows } => rows
                .iter()
                .map(|row| format!("{},{},{}", row.id, sanitize(&row.name).replace(',', "_"), row.points))
                .collect(),
            ServerEvent::UpdateBestClient { id, name, points } => {
                vec![id.to_string(), sanitize(name), points.to_string()]
            }
            ServerEvent::Broadcast { message, notice } => vec![sanitize(message), flag(*notice)],
            ServerEvent::Spectate { id } => vec![id.to_string()],
            ServerEvent::Queued { position } => vec![position.to_string()],
            ServerEvent::JoinGame { id, position } => vec![id.to_string(), format_point(*position)],
            ServerEvent::Emote { id, name } | ServerEvent::Action { id, name } => {
                vec![id.to_string(), sanitize(name)]
            }
            ServerEvent::UpgradeChosen { id, choice } => vec![id.to_string(), choice.to_string()],
            ServerEvent::Level2Changed { open } => vec![flag(*open)],
        }
    }

    /// Client id of a high-frequency player update. The round log samples these
    /// per client instead of recording them in full.
    pub fn player_update_id(&self) -> Option<u32> {
        match self {
            ServerEvent::UpdatePlayer { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Free text must not contain the argument separator.
fn sanitize(text: &str) -> String {
    text.replace(':', "_")
}

fn flag(v: bool) -> String {
    String::from(if v { "1" } else { "0" })
}
