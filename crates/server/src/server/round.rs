//! Rounds and rotation.

use protocol::packets::ServerEvent;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use super::client::{Client, LifeState};
use super::game::GameState;
use super::realm::{RealmRequest, RewardEconomy};
use super::scheduler::TaskKind;
use crate::config::PresetConfig;
use crate::entity::{Reward, RewardClaim};
use crate::gamemodes::{GAME_MODES, get_gamemode};

/// Someone who entered play during a round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub id: u32,
    pub address: String,
    pub name: String,
}

/// The running round.
#[derive(Debug, Clone)]
pub struct Round {
    pub id: u64,
    pub game_mode: String,
    pub preset: Option<String>,
    pub started_at: u64,
    pub ends_at: u64,
    pub participants: Vec<Participant>,
    pub claims: Vec<RewardClaim>,
    /// The last claimed reward, with its winner set.
    pub last_reward: Option<Reward>,
}

impl Round {
    pub fn new(id: u64, game_mode: &str, preset: Option<String>, now: u64, length_seconds: u64) -> Self {
        Self {
            id,
            game_mode: game_mode.to_string(),
            preset,
            started_at: now,
            ends_at: now + length_seconds * 1000,
            participants: Vec::new(),
            claims: Vec::new(),
            last_reward: None,
        }
    }

    /// Address of whoever claimed the last reward.
    pub fn last_reward_winner(&self) -> Option<&str> {
        self.last_reward.as_ref().and_then(|reward| reward.winner.as_deref())
    }

    /// Record participation once per address.
    pub fn add_participant(&mut self, client: &Client) {
        if self.participants.iter().any(|p| p.address == client.address) {
            return;
        }
        self.participants.push(Participant {
            id: client.id,
            address: client.address.clone(),
            name: client.name.clone(),
        });
    }

    pub fn info_event(&self) -> ServerEvent {
        ServerEvent::SetRoundInfo {
            round_id: self.id,
            game_mode: self.game_mode.clone(),
            started_at: self.started_at,
            ends_at: self.ends_at,
        }
    }
}

/// One line of a round result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundStanding {
    pub address: String,
    pub name: String,
    pub points: u64,
    pub kills: u32,
    pub deaths: u32,
    pub rewards: u32,
}

/// Round result handed to the realm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSummary {
    pub round_id: u64,
    pub game_mode: String,
    pub started_at: u64,
    pub ended_at: u64,
    pub winner: Option<RoundStanding>,
    pub participants: Vec<RoundStanding>,
    pub claims: Vec<RewardClaim>,
    pub events_logged: usize,
}

/// Totals carried across rounds per address.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankStats {
    pub rounds: u32,
    pub points: u64,
    pub kills: u32,
    pub deaths: u32,
    pub rewards: u32,
}

impl RankStats {
    fn absorb(&mut self, client: &Client) {
        self.rounds += 1;
        self.points += client.points;
        self.kills += client.kills;
        self.deaths += client.deaths;
        self.rewards += client.rewards;
    }
}

impl GameState {
    /// Summarize the running round from the clients still connected.
    pub fn round_summary(&self, now: u64) -> RoundSummary {
        let mut participants: Vec<(u32, RoundStanding)> = self
            .clients
            .values()
            .filter(|c| c.state != LifeState::Disconnected)
            .filter(|c| self.round.participants.iter().any(|p| p.address == c.address))
            .map(|c| {
                (
                    c.id,
                    RoundStanding {
                        address: c.address.clone(),
                        name: c.name.clone(),
                        points: c.points,
                        kills: c.kills,
                        deaths: c.deaths,
                        rewards: c.rewards,
                    },
                )
            })
            .collect();
        participants.sort_by(|(a_id, a), (b_id, b)| b.points.cmp(&a.points).then(a_id.cmp(b_id)));
        let participants: Vec<RoundStanding> = participants.into_iter().map(|(_, s)| s).collect();

        RoundSummary {
            round_id: self.round.id,
            game_mode: self.round.game_mode.clone(),
            started_at: self.round.started_at,
            ended_at: now,
            winner: participants.first().cloned(),
            participants,
            claims: self.round.claims.clone(),
            events_logged: self.outbox.log.len(),
        }
    }

    /// End the running round and start the next one in a different game mode.
    pub fn rotate_round(&mut self, now: u64) -> RoundSummary {
        let summary = self.round_summary(now);

        for client in self.clients.values().filter(|c| c.state != LifeState::Disconnected) {
            self.rank_stats.entry(client.address.clone()).or_default().absorb(client);
        }

        let current = self.round.game_mode.clone();
        let preset = self.next_preset(&current);
        let mut config = match self.base_config.round_config(preset.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to build round config, using base: {}", e);
                self.base_config.clone()
            }
        };
        let game_mode = match &preset {
            Some(preset) => preset.game_mode.clone(),
            None => next_builtin_mode(&current).to_string(),
        };
        config.game.game_mode = game_mode.clone();
        self.config = config;
        self.gamemode = get_gamemode(&game_mode);
        self.dynamic_decay_power = self.config.vitality.decay_power;

        if let Some(winner) = &summary.winner {
            self.emit(
                ServerEvent::RoundWinner { round_id: summary.round_id, name: winner.name.clone(), points: winner.points },
                now,
            );
        }

        self.round = Round::new(
            summary.round_id + 1,
            &game_mode,
            preset.map(|p| p.name),
            now,
            self.config.loops.round_loop_seconds,
        );
        self.outbox.log.clear();

        for id in self.world.clear_orbs() {
            self.emit(ServerEvent::RemoveOrb { id }, now);
        }

        let ids: Vec<u32> = self.clients.keys().copied().collect();
        for id in ids {
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            client.reset_counters();
            client.nearby.mark_dirty();
            let was_alive = client.is_alive();
            if client.state.is_admitted() {
                self.force_join(id, now);
                if was_alive {
                    if let Some(client) = self.clients.get_mut(&id) {
                        client.state = LifeState::Alive;
                        let event = client.spawn_event();
                        self.emit(event, now);
                    }
                }
            }
        }

        let info = self.round.info_event();
        self.emit(info, now);
        self.emit(ServerEvent::ClearLeaderboard, now);
        self.best_client = None;
        self.clamp_clients();
        self.scheduler.set_periods(&self.config.loops, now);
        self.scheduler.reset(TaskKind::RoundRotation, now);
        self.sync_sprites(now);
        self.realm_requests.push(RealmRequest::SaveRound(summary.clone()));

        info!(
            "Round {} finished ({}), round {} starts in {}",
            summary.round_id, summary.game_mode, self.round.id, game_mode
        );
        summary
    }

    /// Reward economy returned by the realm after a save.
    pub fn apply_economy(&mut self, economy: RewardEconomy) {
        info!("Reward economy: {} x{}", economy.kind, economy.quantity);
        self.base_config.rewards.kind = economy.kind.clone();
        self.base_config.rewards.quantity = economy.quantity;
        self.config.rewards.kind = economy.kind;
        self.config.rewards.quantity = economy.quantity;
    }

    /// Cumulative stats for an address over every finished round.
    pub fn rank_stats(&self, address: &str) -> Option<&RankStats> {
        self.rank_stats.get(address)
    }

    fn next_preset(&mut self, current: &str) -> Option<PresetConfig> {
        let candidates: Vec<&PresetConfig> =
            self.base_config.presets.iter().filter(|p| p.game_mode != current).collect();
        if candidates.is_empty() {
            return None;
        }
        let idx = self.world.rng.random_range(0..candidates.len());
        Some(candidates[idx].clone())
    }
}

/// The built-in mode after `current`, never `current` itself.
fn next_builtin_mode(current: &str) -> &'static str {
    let idx = GAME_MODES.iter().position(|m| *m == current).map_or(0, |i| i + 1);
    GAME_MODES[idx % GAME_MODES.len()]
}

/// Rank stats keyed by address.
pub type RankTable = HashMap<String, RankStats>;
