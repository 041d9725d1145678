//! Game state and main loop.

use fixedbitset::FixedBitSet;
use protocol::packets::{LeaderboardRow, ServerEvent};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{RwLock, broadcast};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::client::{Client, LifeState};
use super::events::{Outbox, Outgoing};
use super::realm::{Realm, RealmRequest, RewardGrant};
use super::round::{RankTable, Round};
use super::scheduler::{Scheduler, TaskKind};
use crate::config::Config;
use crate::error::SimulationError;
use crate::gamemodes::{GameMode, get_gamemode};
use crate::world::{OrbTiming, World};

/// Ticks between per-tick debug summaries.
const DEBUG_EVERY_TICKS: u64 = 250;
/// Time a released orb stays uncollectible.
const ORB_ENABLE_DELAY_MS: u64 = 500;

/// Main game state.
pub struct GameState {
    /// Config as loaded, before round layering.
    pub base_config: Config,
    /// Active round config.
    pub config: Config,
    pub tick_count: u64,

    next_client_id: u32,
    /// Ordered by id so every pass visits clients in the same order.
    pub clients: BTreeMap<u32, Client>,

    pub world: World,
    pub round: Round,
    pub gamemode: Box<dyn GameMode>,
    pub outbox: Outbox,
    pub scheduler: Scheduler,

    /// Admission queue, FIFO.
    pub(crate) queue: VecDeque<u32>,
    /// (client, teardown at)
    pub(crate) pending_teardowns: Vec<(u32, u64)>,
    /// Connect times per network hash.
    pub(crate) connect_history: HashMap<String, Vec<u64>>,
    pub(crate) rank_stats: RankTable,

    pub(crate) realm: Arc<dyn Realm>,
    pub(crate) realm_requests: Vec<RealmRequest>,
    pub(crate) rewards_paused: bool,

    /// Global decay power maintained by the slow loop.
    pub(crate) dynamic_decay_power: f64,
    pub(crate) best_client: Option<u32>,
    last_fast_tick: Option<u64>,

    // Reusable buffer for the combat scan
    pub(crate) combat_dead: FixedBitSet,

    /// Average fast tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

/// Snapshot served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub name: String,
    pub round_id: u64,
    pub game_mode: String,
    pub started_at: u64,
    pub ends_at: u64,
    pub clients: usize,
    pub alive: usize,
    pub queued: usize,
    pub sprites: usize,
    pub orbs: usize,
    pub reward_live: bool,
    pub level2_open: bool,
    pub tick_count: u64,
    pub update_time_avg: f64,
}

impl GameState {
    /// Create a new game state. The first round runs on the base config layered with `shared`.
    pub fn new(config: &Config, realm: Arc<dyn Realm>, now: u64) -> Self {
        let round_config = match config.round_config(None) {
            Ok(round_config) => round_config,
            Err(e) => {
                warn!("Failed to apply shared overrides, using base config: {}", e);
                config.clone()
            }
        };
        let mut world = World::new(&round_config.world, config.server.seed);
        let (spawned, _) = world.sync_powerups(round_config.pickup.sprites_start_count, round_config.pickup.sprite_scale);
        info!("World initialized: {} sprites, {} colliders", spawned.len(), world.colliders.len());

        let game_mode = round_config.game.game_mode.clone();
        Self {
            base_config: config.clone(),
            tick_count: 0,
            next_client_id: 1,
            clients: BTreeMap::new(),
            world,
            round: Round::new(1, &game_mode, None, now, round_config.loops.round_loop_seconds),
            gamemode: get_gamemode(&game_mode),
            outbox: Outbox::new(),
            scheduler: Scheduler::new(&round_config.loops, now),
            queue: VecDeque::new(),
            pending_teardowns: Vec::new(),
            connect_history: HashMap::new(),
            rank_stats: RankTable::new(),
            realm,
            realm_requests: Vec::new(),
            rewards_paused: false,
            dynamic_decay_power: round_config.vitality.decay_power,
            best_client: None,
            last_fast_tick: None,
            combat_dead: FixedBitSet::new(),
            update_time_avg: 0.0,
            config: round_config,
        }
    }

    pub(crate) fn next_client_id(&mut self) -> u32 {
        let id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1).max(1);
        id
    }

    /// Queue a broadcast event.
    pub fn emit(&mut self, event: ServerEvent, now: u64) {
        self.outbox.broadcast(event, now, self.config.loops.update_record_interval_ms);
    }

    pub fn client(&self, id: u32) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn client_mut(&mut self, id: u32) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn alive_count(&self) -> usize {
        self.clients.values().filter(|c| c.is_alive()).count()
    }

    /// Clients counting against `max_clients`.
    pub fn admitted_count(&self) -> usize {
        self.clients.values().filter(|c| c.state.is_admitted()).count()
    }

    pub(crate) fn alive_ids(&self) -> Vec<u32> {
        self.clients.values().filter(|c| c.is_alive()).map(|c| c.id).collect()
    }

    /// Queue position of a client, starting at 1.
    pub fn queue_position(&self, id: u32) -> Option<usize> {
        self.queue.iter().position(|&q| q == id).map(|p| p + 1)
    }

    /// Sprite pool size the world must hold.
    pub fn sprite_target(&self) -> usize {
        self.config.pickup.sprites_start_count + self.alive_count() * self.config.pickup.sprites_per_client
    }

    /// Bring the sprite pool to its target size, broadcasting every change.
    pub fn sync_sprites(&mut self, now: u64) {
        let target = self.sprite_target();
        let (spawned, removed) = self.world.sync_powerups(target, self.config.pickup.sprite_scale);
        for powerup in spawned {
            self.emit(powerup.spawn_event(), now);
        }
        for id in removed {
            self.emit(ServerEvent::RemovePowerUp { id }, now);
        }
    }

    /// Decay power applied to every client this tick.
    pub fn global_decay_power(&self) -> f64 {
        if self.config.vitality.dynamic_decay_power {
            self.dynamic_decay_power
        } else {
            self.config.vitality.decay_power
        }
    }

    /// Bring live state back inside the bounds of a changed config.
    pub fn apply_live_config(&mut self, now: u64) {
        self.clamp_clients();
        self.scheduler.set_periods(&self.config.loops, now);
        if let Some(ends_at) = self.scheduler.next_due(TaskKind::RoundRotation) {
            if ends_at != self.round.ends_at {
                self.round.ends_at = ends_at;
                let info = self.round.info_event();
                self.emit(info, now);
            }
        }
    }

    pub(crate) fn clamp_clients(&mut self) {
        let max_stage = self.config.vitality.max_stage();
        for client in self.clients.values_mut() {
            if client.avatar > max_stage {
                warn!("Client {} clamped from stage {} to {}", client.id, client.avatar, max_stage);
                client.avatar = max_stage;
            }
            client.xp = client.xp.min(client.max_hp);
            client.recompute_speed(&self.config);
            client.nearby.mark_dirty();
        }
    }

    /// Run every task due at `now`. A fast tick failure is fatal: every client
    /// is dropped and the error is returned.
    pub fn step(&mut self, now: u64) -> Result<(), SimulationError> {
        for kind in self.scheduler.due(now) {
            match kind {
                TaskKind::Fast => {
                    let result = catch_unwind(AssertUnwindSafe(|| self.fast_tick(now)))
                        .unwrap_or_else(|payload| Err(SimulationError::Panicked(panic_message(payload))));
                    if let Err(e) = result {
                        error!("Fatal error in fast tick #{}: {}", self.tick_count, e);
                        self.shutdown(now);
                        return Err(e);
                    }
                }
                TaskKind::Slow => self.slow_tick(now),
                TaskKind::ConnectionCheck => self.connection_check(now),
                TaskKind::RewardSpawn => self.reward_tick(now),
                TaskKind::Leaderboard => self.leaderboard_tick(now),
                TaskKind::RoundRotation => {
                    self.rotate_round(now);
                }
            }
            self.scheduler.complete(kind, now);
        }
        Ok(())
    }

    /// One simulation step: movement, combat, pickups, vitality, then a flush when due.
    pub fn fast_tick(&mut self, now: u64) -> Result<(), SimulationError> {
        self.tick_count += 1;
        let dt_ms = match self.last_fast_tick {
            Some(last) => now.saturating_sub(last),
            None => self.config.loops.fast_ms,
        };
        self.last_fast_tick = Some(now);
        let dt = dt_ms as f64 / 1000.0;

        self.process_teardowns(now);

        let timing = OrbTiming {
            enable_delay_ms: ORB_ENABLE_DELAY_MS,
            lifetime_ms: self.config.combat.orb_lifetime_ms,
        };
        let released = self.world.release_due_orbs(self.round.id, now, self.config.combat.orb_scale, timing);
        for orb in released {
            self.emit(orb.spawn_event(), now);
        }
        self.sweep_expired(now);

        self.resolve_movement(now, dt as f32);
        self.resolve_combat(now);
        self.resolve_pickups(now);
        self.resolve_vitality(now, dt);

        self.check_invariants()?;

        if self.outbox.flush_due(now, self.config.loops.flush_interval_ms) {
            self.outbox.flush(now)?;
        }

        if self.tick_count % DEBUG_EVERY_TICKS == 0 {
            debug!(
                "Tick #{}: {} clients ({} alive), {} sprites, {} orbs",
                self.tick_count,
                self.clients.len(),
                self.alive_count(),
                self.world.powerups.len(),
                self.world.orbs.len()
            );
        }
        Ok(())
    }

    fn sweep_expired(&mut self, now: u64) {
        let expired = self.world.sweep_expired(now);
        for id in expired.orbs {
            self.emit(ServerEvent::RemoveOrb { id }, now);
        }
        if let Some(id) = expired.reward {
            info!("Reward {} expired unclaimed", id);
            self.emit(ServerEvent::RemoveReward { id }, now);
        }
    }

    fn check_invariants(&self) -> Result<(), SimulationError> {
        let max_evolves = self.config.vitality.max_evolves;
        for client in self.clients.values() {
            if client.avatar >= max_evolves {
                return Err(SimulationError::Invariant { id: client.id, what: "avatar stage bound" });
            }
            if !(client.xp.is_finite() && client.xp >= 0.0) {
                return Err(SimulationError::Invariant { id: client.id, what: "non-negative xp" });
            }
        }
        Ok(())
    }

    /// Drop every client at once and flush what is left.
    pub fn shutdown(&mut self, now: u64) {
        let ids: Vec<u32> = self.clients.keys().copied().collect();
        for id in ids {
            self.disconnect(id, "server error", true, now);
        }
        if let Err(e) = self.outbox.flush(now) {
            error!("Failed to flush on shutdown: {}", e);
        }
    }

    /// Dynamic difficulty, the level-2 gate and a pool resync.
    pub fn slow_tick(&mut self, now: u64) {
        let alive = self.alive_count();
        if self.config.vitality.dynamic_decay_power {
            let max_stage = self.config.vitality.max_stage();
            let max_evolved = self.clients.values().filter(|c| c.is_alive() && c.avatar >= max_stage).count();
            self.dynamic_decay_power = self.config.vitality.decay_power
                + max_evolved as f64 * self.config.vitality.decay_power_per_max_evolved;
        }

        let open = alive >= self.config.game.players_required_for_level2;
        if open != self.world.level2_open {
            self.world.level2_open = open;
            for client in self.clients.values_mut() {
                client.nearby.mark_dirty();
            }
            info!("Level 2 {} ({} alive)", if open { "opened" } else { "closed" }, alive);
            self.emit(ServerEvent::Level2Changed { open }, now);
        }

        self.sync_sprites(now);
    }

    /// Timeout and mismatch sweep.
    pub fn connection_check(&mut self, now: u64) {
        let anticheat = &self.config.anticheat;
        let mut drops: Vec<(u32, &'static str)> = Vec::new();
        for client in self.clients.values_mut().filter(|c| c.state.is_admitted()) {
            if now.saturating_sub(client.last_update) > anticheat.client_timeout_ms {
                client.log.timeouts += 1;
                drops.push((client.id, "timed out"));
            } else if anticheat.disconnect_on_position_mismatch
                && client.log.position_mismatch > anticheat.position_mismatch_limit
            {
                warn!("Client {} exceeded the position mismatch limit", client.id);
                drops.push((client.id, "position mismatch"));
            }
        }
        for (id, reason) in drops {
            self.disconnect(id, reason, false, now);
        }
        self.process_teardowns(now);
    }

    /// Ask the realm for a reward when the slot is empty.
    pub fn reward_tick(&mut self, now: u64) {
        if !self.config.rewards.enabled {
            return;
        }
        if !self.realm.is_connected() {
            if !self.rewards_paused {
                self.rewards_paused = true;
                warn!("Realm unreachable, reward spawning paused");
                self.emit(ServerEvent::Broadcast { message: "Rewards are paused".into(), notice: true }, now);
            }
            return;
        }
        if self.rewards_paused {
            self.rewards_paused = false;
            info!("Realm reachable again, reward spawning resumed");
            self.emit(ServerEvent::Broadcast { message: "Rewards are back".into(), notice: true }, now);
        }
        if self.world.reward.is_none() {
            self.realm_requests.push(RealmRequest::FetchReward);
        }
    }

    /// Place a granted reward. Ignored while the slot is taken.
    pub fn apply_reward_grant(&mut self, grant: RewardGrant, now: u64) {
        if self.world.reward.is_some() {
            return;
        }
        let enabled_at = now + self.config.rewards.enable_delay_ms;
        let expires_at = enabled_at + self.config.rewards.lifetime_ms;
        let reward = self.world.spawn_reward(&grant.kind, grant.quantity, enabled_at, expires_at);
        info!("Reward {} spawned: {} x{}", reward.id, reward.kind, reward.quantity);
        self.emit(reward.spawn_event(), now);
    }

    /// Top entries by points.
    pub fn leaderboard(&self) -> Vec<LeaderboardRow> {
        let mut rows: Vec<LeaderboardRow> = self
            .clients
            .values()
            .filter(|c| matches!(c.state, LifeState::Joining | LifeState::Alive | LifeState::Dead))
            .map(|c| LeaderboardRow { id: c.id, name: c.name.clone(), points: c.points })
            .collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points).then(a.id.cmp(&b.id)));
        rows.truncate(self.config.game.leaderboard_size);
        rows
    }

    pub fn leaderboard_tick(&mut self, now: u64) {
        let rows = self.leaderboard();
        if let Some(top) = rows.first() {
            if self.best_client != Some(top.id) {
                self.best_client = Some(top.id);
                let event = ServerEvent::UpdateBestClient { id: top.id, name: top.name.clone(), points: top.points };
                self.emit(event, now);
            }
        }
        self.emit(ServerEvent::Leaderboard { rows }, now);
    }

    /// Compiled frames for the transport, direct events included.
    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        if let Err(e) = self.outbox.drain_direct() {
            error!("Failed to compile direct events: {}", e);
        }
        self.outbox.take_outgoing()
    }

    pub fn take_realm_requests(&mut self) -> Vec<RealmRequest> {
        std::mem::take(&mut self.realm_requests)
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            name: self.config.server.name.clone(),
            round_id: self.round.id,
            game_mode: self.round.game_mode.clone(),
            started_at: self.round.started_at,
            ends_at: self.round.ends_at,
            clients: self.clients.len(),
            alive: self.alive_count(),
            queued: self.queue.len(),
            sprites: self.world.powerups.len(),
            orbs: self.world.orbs.len(),
            reward_live: self.world.reward.is_some(),
            level2_open: self.world.level2_open,
            tick_count: self.tick_count,
            update_time_avg: self.update_time_avg,
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Wall clock in epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Run the main game loop. Returns only on a fatal simulation error.
pub async fn run_game_loop(
    state: Arc<RwLock<GameState>>,
    outgoing_tx: broadcast::Sender<Outgoing>,
) -> Result<(), SimulationError> {
    loop {
        let wait_ms = {
            let game = state.read().await;
            game.scheduler
                .next_wakeup()
                .map_or(game.config.loops.fast_ms, |due| due.saturating_sub(now_ms()))
        };
        if wait_ms > 0 {
            sleep(Duration::from_millis(wait_ms)).await;
        }

        let (result, frames, requests, realm) = {
            let mut game = state.write().await;
            let tick_start = std::time::Instant::now();
            let result = game.step(now_ms());
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            let tick_budget = game.config.loops.fast_ms as f64 * 0.9;
            if tick_ms > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} clients, {} sprites",
                    game.tick_count,
                    tick_ms,
                    tick_budget,
                    game.clients.len(),
                    game.world.powerups.len()
                );
            }
            (result, game.take_outgoing(), game.take_realm_requests(), Arc::clone(&game.realm))
        };

        for frame in frames {
            // No receivers just means nobody is connected.
            let _ = outgoing_tx.send(frame);
        }

        for request in requests {
            spawn_realm_request(Arc::clone(&state), Arc::clone(&realm), request);
        }

        result?;
    }
}

/// Carry out a realm call off the lock and apply its answer under it.
fn spawn_realm_request(state: Arc<RwLock<GameState>>, realm: Arc<dyn Realm>, request: RealmRequest) {
    tokio::spawn(async move {
        match request {
            RealmRequest::SaveRound(summary) => {
                let round_id = summary.round_id;
                match realm.save_round(summary).await {
                    Ok(economy) => state.write().await.apply_economy(economy),
                    Err(e) => warn!("Failed to save round {}: {}", round_id, e),
                }
            }
            RealmRequest::FetchReward => match realm.fetch_reward().await {
                Ok(Some(grant)) => state.write().await.apply_reward_grant(grant, now_ms()),
                Ok(None) => {}
                Err(e) => warn!("Failed to fetch reward: {}", e),
            },
        }
    });
}
