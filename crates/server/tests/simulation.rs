use protocol::packets::ServerEvent;
use server::server::{RealmRequest, RewardGrant};
use server::{Config, GameState, Identity, IntentError, KillOutcome, LifeState, LocalRealm, OfflineRealm, Realm};
use glam::Vec2;
use protocol::packets::ModCommand;
use server::config::PresetConfig;
use server::entity::PendingOrb;
use server::mechanics::Mechanic;
use server::server::scheduler::TaskKind;
use server::SimulationError;
use std::sync::Arc;

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.seed = Some(7);
    config.game.spawn_invincibility_ms = 0;
    config.game.immunity_seconds = 0;
    config
}

fn new_state(config: &Config) -> GameState {
    GameState::new(config, LocalRealm::shared(&config.rewards), 0)
}

/// Connect from a distinct /24 and bring the client all the way to alive.
fn spawn(state: &mut GameState, network: u8, now: u64) -> u32 {
    let id = state.connect(
        Identity { address: format!("10.0.{network}.1:4000"), name: format!("p{network}"), is_mod: false },
        now,
    );
    state.join(id, now).unwrap();
    let p = state.client(id).unwrap().position;
    let point = format!("{}:{}", p.x, p.y);
    state.update_myself(id, &point, &point, now, now).unwrap();
    assert_eq!(state.client(id).unwrap().state, LifeState::Alive);
    id
}

fn logged(state: &GameState, pred: impl Fn(&ServerEvent) -> bool) -> usize {
    state.outbox.log.entries.iter().filter(|(_, e)| pred(e)).count()
}

#[test]
fn test_clients_stay_within_bounds() {
    let config = test_config();
    let mut state = new_state(&config);
    let ids: Vec<u32> = (1..=4).map(|n| spawn(&mut state, n, 0)).collect();

    for tick in 1..=200u64 {
        state.fast_tick(tick * 40).unwrap();
    }
    let border = state.world.border;
    for client in ids.iter().filter_map(|id| state.client(*id)) {
        assert!(client.avatar < config.vitality.max_evolves);
        assert!(client.xp >= 0.0);
        assert!(border.contains(client.position));
    }
}

#[test]
fn test_sprite_pool_tracks_alive_count() {
    let config = test_config();
    let mut state = new_state(&config);
    assert_eq!(state.world.powerups.len(), config.pickup.sprites_start_count);

    let a = spawn(&mut state, 1, 0);
    let _b = spawn(&mut state, 2, 0);
    assert_eq!(state.world.powerups.len(), state.sprite_target());
    assert_eq!(state.sprite_target(), config.pickup.sprites_start_count + 2 * config.pickup.sprites_per_client);

    state.disconnect(a, "left", true, 10);
    assert_eq!(state.world.powerups.len(), config.pickup.sprites_start_count + config.pickup.sprites_per_client);
}

#[test]
fn test_disconnect_is_idempotent() {
    let config = test_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);

    state.disconnect(id, "left", false, 10);
    state.disconnect(id, "left", false, 20);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::Disconnected { .. })), 1);
    assert_eq!(state.client(id).unwrap().state, LifeState::Disconnected);

    // An immediate call brings the pending teardown forward.
    state.disconnect(id, "left", true, 30);
    assert!(state.client(id).is_none());
    state.disconnect(id, "left", true, 40);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::Disconnected { .. })), 1);
}

#[test]
fn test_kill_pays_out_and_drops_orb() {
    let config = test_config();
    let mut state = new_state(&config);
    let winner = spawn(&mut state, 1, 0);
    let loser = spawn(&mut state, 2, 0);
    {
        let loser = state.client_mut(loser).unwrap();
        loser.xp = 1.0;
        loser.points = 100;
    }

    assert_eq!(state.register_kill(winner, loser, 100), KillOutcome::Killed);
    let w = state.client(winner).unwrap();
    assert_eq!(w.kills, 1);
    assert_eq!(w.points, config.game.points_per_kill);
    assert_eq!(state.client(loser).unwrap().state, LifeState::Dead);
    assert_eq!(state.client(loser).unwrap().points, 75);
    assert_eq!(state.world.pending_orbs.len(), 1);
    assert_eq!(state.world.pending_orbs[0].points, 25);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::GameOver { .. })), 1);

    // A dead client cannot be killed again.
    assert_eq!(state.register_kill(winner, loser, 200), KillOutcome::Aborted);
}

#[test]
fn test_kill_attempt_only_damages_healthy_client() {
    let config = test_config();
    let mut state = new_state(&config);
    let a = spawn(&mut state, 1, 0);
    let b = spawn(&mut state, 2, 0);
    let before = state.client(b).unwrap().xp;

    assert_eq!(state.register_kill(a, b, 100), KillOutcome::Damaged);
    assert_eq!(state.client(b).unwrap().xp, before - config.combat.damage_per_touch);
    assert_eq!(state.client(b).unwrap().last_touch, Some((a, 100)));
    assert_eq!(state.register_kill(a, a, 100), KillOutcome::Aborted);
}

#[test]
fn test_repeat_kills_are_blocked() {
    let config = test_config();
    let mut state = new_state(&config);
    let a = spawn(&mut state, 1, 0);
    let b = spawn(&mut state, 2, 0);
    let hash = state.client(b).unwrap().network_hash.clone();
    state.client_mut(a).unwrap().kill_log = vec![hash; config.anticheat.too_many_kills_threshold];
    state.client_mut(b).unwrap().xp = 1.0;

    assert_eq!(state.register_kill(a, b, 100), KillOutcome::Blocked);
    let victim = state.client(b).unwrap();
    assert_eq!(victim.log.too_many_kills, 1);
    assert_eq!(victim.xp, 1.0);
    assert_eq!(victim.state, LifeState::Alive);
    assert_eq!(state.client(a).unwrap().kills, 0);
}

#[test]
fn test_victim_not_trying_pays_nothing() {
    let config = test_config();
    let mut state = new_state(&config);
    let a = spawn(&mut state, 1, 0);
    let b = spawn(&mut state, 2, 0);
    let _bystanders: Vec<u32> = (3..=6).map(|n| spawn(&mut state, n, 0)).collect();
    let hash = state.client(b).unwrap().network_hash.clone();
    state.client_mut(a).unwrap().kill_log = vec![hash.clone(), hash, "elsewhere".into(), "x".into()];
    state.client_mut(b).unwrap().xp = 1.0;

    assert_eq!(state.register_kill(a, b, 100), KillOutcome::Killed);
    assert_eq!(state.client(a).unwrap().points, 0);
    assert_eq!(state.client(b).unwrap().log.not_really_trying, 1);
}

#[test]
fn test_starvation_disconnects() {
    let mut config = test_config();
    config.loops.fast_ms = 1000;
    config.vitality.start_xp = 100.0;
    config.vitality.avatar_decay_power[0] = 10.0;
    config.pickup.sprites_start_count = 0;
    config.pickup.sprites_per_client = 0;
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);

    for tick in 1..10u64 {
        state.fast_tick(tick * 1000).unwrap();
    }
    let client = state.client(id).unwrap();
    assert_eq!(client.state, LifeState::Alive);
    assert!((client.xp - 10.0).abs() < 1e-9);

    state.fast_tick(10_000).unwrap();
    assert_eq!(state.client(id).unwrap().state, LifeState::Disconnected);
    assert_eq!(
        logged(&state, |e| matches!(e, ServerEvent::Disconnected { reason, .. } if reason == "starved")),
        1
    );
}

#[test]
fn test_starvation_credits_last_toucher() {
    let mut config = test_config();
    config.pickup.sprites_start_count = 0;
    config.pickup.sprites_per_client = 0;
    let mut state = new_state(&config);
    let hunter = spawn(&mut state, 1, 0);
    let prey = spawn(&mut state, 2, 0);
    // Keep them apart so no contact happens during the tick.
    state.client_mut(hunter).unwrap().place(glam::Vec2::new(-40.0, -40.0));
    state.client_mut(prey).unwrap().place(glam::Vec2::new(40.0, 40.0));
    {
        let prey = state.client_mut(prey).unwrap();
        prey.xp = 0.001;
        prey.last_touch = Some((hunter, 900));
    }

    state.fast_tick(1000).unwrap();
    assert_eq!(state.client(prey).unwrap().state, LifeState::Dead);
    assert_eq!(state.client(hunter).unwrap().kills, 1);
}

#[test]
fn test_malformed_update_changes_nothing() {
    let config = test_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    let before = state.client(id).unwrap().client_target;

    let err = state.update_myself(id, "abc:1", "1:1", 10, 10).unwrap_err();
    assert!(matches!(err, IntentError::Malformed(_)));
    let err = state.update_myself(id, "1:1", "1000:0", 10, 10).unwrap_err();
    assert!(matches!(err, IntentError::OutOfBounds));

    let client = state.client(id).unwrap();
    assert_eq!(client.client_target, before);
    assert_eq!(client.log.rejected_updates, 2);
}

#[test]
fn test_full_server_queues_joins() {
    let mut config = test_config();
    config.game.max_clients = 1;
    let mut state = new_state(&config);
    let first = spawn(&mut state, 1, 0);
    let second = state.connect(
        Identity { address: "10.0.2.1:4000".into(), name: "second".into(), is_mod: false },
        0,
    );

    state.join(second, 0).unwrap();
    assert_eq!(state.client(second).unwrap().state, LifeState::Spectating);
    assert_eq!(state.queue_position(second), Some(1));
    assert!(
        state
            .outbox
            .pending_direct()
            .iter()
            .any(|(id, e)| *id == second && matches!(e, ServerEvent::Queued { position: 1 }))
    );

    state.disconnect(first, "left", true, 100);
    assert_eq!(state.client(second).unwrap().state, LifeState::Joining);
    assert_eq!(state.queue_position(second), None);

    let p = state.client(second).unwrap().position;
    let point = format!("{}:{}", p.x, p.y);
    state.update_myself(second, &point, &point, 150, 150).unwrap();
    assert_eq!(state.client(second).unwrap().state, LifeState::Alive);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::SpawnPlayer { id, .. } if *id == second)), 1);
}

#[test]
fn test_duplicate_network_replaces_session() {
    let config = test_config();
    let mut state = new_state(&config);
    let first = spawn(&mut state, 1, 0);
    let second = state.connect(
        Identity { address: "10.0.1.2:4000".into(), name: "again".into(), is_mod: false },
        50,
    );
    assert!(state.client(first).is_none());
    assert!(state.client(second).is_some());
}

#[test]
fn test_reward_not_claimed_twice_in_a_row() {
    let mut config = test_config();
    config.pickup.sprites_start_count = 0;
    config.pickup.sprites_per_client = 0;
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    let position = state.client(id).unwrap().position;
    let address = state.client(id).unwrap().address.clone();
    let place_reward = |state: &mut GameState| {
        let reward = state.world.reward.as_mut().unwrap();
        reward.position = position;
        reward.enabled_at = 0;
    };

    state.apply_reward_grant(RewardGrant { kind: "token".into(), quantity: 3 }, 0);
    place_reward(&mut state);
    state.fast_tick(40).unwrap();
    assert!(state.world.reward.is_none());
    assert_eq!(state.client(id).unwrap().rewards, 1);
    assert_eq!(state.round.claims.len(), 1);
    assert_eq!(state.round.claims[0].quantity, 3);
    let last = state.round.last_reward.as_ref().unwrap();
    assert_eq!(last.winner.as_deref(), Some(address.as_str()));
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::RemoveReward { id } if *id == last.id)), 1);

    state.apply_reward_grant(RewardGrant { kind: "token".into(), quantity: 1 }, 40);
    place_reward(&mut state);
    state.fast_tick(80).unwrap();
    assert!(state.world.reward.is_some());
    assert_eq!(state.client(id).unwrap().rewards, 1);

    state.round.last_reward = None;
    state.fast_tick(120).unwrap();
    assert!(state.world.reward.is_none());
    assert_eq!(state.client(id).unwrap().rewards, 2);
}

#[test]
fn test_rotation_resets_counters_and_mode() {
    let config = test_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    {
        let client = state.client_mut(id).unwrap();
        client.points = 50;
        client.kills = 2;
    }
    let mode = state.round.game_mode.clone();
    let address = state.client(id).unwrap().address.clone();
    state.world.add_orb(5, 1.0, Vec2::new(30.0, 30.0), 0, 60_000);

    let summary = state.rotate_round(1000);
    assert!(state.world.orbs.is_empty());
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::RemoveOrb { .. })), 1);
    assert_eq!(summary.round_id, 1);
    assert_eq!(summary.winner.as_ref().map(|w| w.points), Some(50));
    assert_eq!(state.round.id, 2);
    assert_ne!(state.round.game_mode, mode);
    assert_eq!(state.config.game.game_mode, state.round.game_mode);

    let client = state.client(id).unwrap();
    assert_eq!(client.points, 0);
    assert_eq!(client.kills, 0);
    assert_eq!(client.state, LifeState::Alive);
    assert_eq!(state.rank_stats(&address).map(|s| s.points), Some(50));
    assert!(state.take_realm_requests().iter().any(|r| matches!(r, RealmRequest::SaveRound(_))));
}

#[test]
fn test_step_runs_due_tasks() {
    let config = test_config();
    let mut state = new_state(&config);
    state.step(0).unwrap();
    assert_eq!(state.tick_count, 1);
    state.step(config.loops.fast_ms).unwrap();
    assert_eq!(state.tick_count, 2);
}

#[test]
fn test_rewards_pause_while_realm_offline() {
    let config = test_config();
    let mut state = GameState::new(&config, Arc::new(OfflineRealm), 0);
    state.reward_tick(100);
    state.reward_tick(200);
    let paused = logged(&state, |e| matches!(e, ServerEvent::Broadcast { message, .. } if message == "Rewards are paused"));
    assert_eq!(paused, 1);
    assert!(state.take_realm_requests().is_empty());
}

#[tokio::test]
async fn test_local_realm_saves_rounds() {
    let config = test_config();
    let realm = LocalRealm::new(&config.rewards);
    let mut state = new_state(&config);
    let summary = state.rotate_round(1000);

    let economy = realm.save_round(summary).await.unwrap();
    assert_eq!(economy.kind, config.rewards.kind);
    assert_eq!(realm.saved_rounds().await.len(), 1);

    realm.set_connected(false);
    assert!(realm.fetch_reward().await.is_err());
}

/// No sprites, so ticks only move clients and burn xp.
fn quiet_config() -> Config {
    let mut config = test_config();
    config.pickup.sprites_start_count = 0;
    config.pickup.sprites_per_client = 0;
    config
}

fn connect_mod(state: &mut GameState, now: u64) -> u32 {
    state.connect(Identity { address: "10.0.99.1:4000".into(), name: "mod".into(), is_mod: true }, now)
}

#[test]
fn test_position_mismatch_phases_client() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    {
        let client = state.client_mut(id).unwrap();
        client.place(Vec2::ZERO);
        client.client_position = Vec2::new(10.0, 0.0);
    }

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.log.position_mismatch, 1);
    assert!(client.is_phased(1099));
    assert!(!client.is_phased(1100));
    assert_eq!(client.position, Vec2::ZERO);
}

#[test]
fn test_border_clamps_and_counts() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    {
        let client = state.client_mut(id).unwrap();
        client.place(Vec2::new(49.95, 0.0));
        client.client_target = Vec2::new(60.0, 0.0);
    }

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.log.out_of_bounds, 1);
    assert_eq!(client.position, Vec2::new(50.0, 0.0));
}

#[test]
fn test_land_sticks_and_slows() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    state.world.add_collider("Land_shore", Vec2::new(0.05, -1.0), Vec2::new(5.0, 1.0)).unwrap();
    {
        let client = state.client_mut(id).unwrap();
        client.place(Vec2::ZERO);
        client.client_target = Vec2::new(1.0, 0.0);
    }

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert!(client.is_stuck);
    assert_eq!(client.log.stuck, 1);
    // the resolved point is kept
    assert!(client.position.x > 0.05);
    assert_eq!(client.target, client.client_target);
    assert!(client.is_phased(3099));
    assert!((client.effective_speed(100) - client.speed * 0.02).abs() < 1e-6);
    assert_eq!(client.effective_speed(1100), client.speed);
}

#[test]
fn test_island_reverts_move() {
    let config = quiet_config();
    assert!(!config.game.sticky_islands);
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    state.world.add_collider("Island_rock", Vec2::new(0.05, -1.0), Vec2::new(5.0, 1.0)).unwrap();
    {
        let client = state.client_mut(id).unwrap();
        client.place(Vec2::ZERO);
        client.client_target = Vec2::new(1.0, 0.0);
    }

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert!(!client.is_stuck);
    assert_eq!(client.log.collided, 1);
    assert_eq!(client.position, Vec2::ZERO);
    assert_eq!(client.target, Vec2::ZERO);
    assert_eq!(client.client_target, Vec2::ZERO);
    assert!((client.effective_speed(100) - client.speed * 0.5).abs() < 1e-6);
}

#[test]
fn test_god_and_invincible_skip_penalties() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let god = spawn(&mut state, 1, 0);
    let shielded = spawn(&mut state, 2, 0);
    state.world.add_collider("Land_west", Vec2::new(-40.0, -40.0), Vec2::new(-30.0, 40.0)).unwrap();
    {
        let client = state.client_mut(god).unwrap();
        client.is_god = true;
        client.place(Vec2::new(-35.0, 0.0));
        client.client_target = Vec2::new(-34.0, 0.0);
    }
    {
        let client = state.client_mut(shielded).unwrap();
        client.invincible_until = 10_000;
        client.place(Vec2::new(-35.0, 20.0));
        client.client_target = Vec2::new(-34.0, 20.0);
    }

    state.fast_tick(100).unwrap();
    let client = state.client(god).unwrap();
    assert!(!client.is_stuck);
    assert_eq!(client.log.stuck, 0);
    assert!(client.position.x > -35.0);

    // stuck is still reported, without the slowdown or phase
    let client = state.client(shielded).unwrap();
    assert!(client.is_stuck);
    assert_eq!(client.log.stuck, 1);
    assert_eq!(client.effective_speed(100), client.speed);
    assert!(!client.is_phased(100));
}

#[test]
fn test_level2_gate_follows_alive_count() {
    let mut config = quiet_config();
    config.game.players_required_for_level2 = 2;
    let mut state = new_state(&config);
    let a = spawn(&mut state, 1, 0);
    state.world.add_collider("Level2Divider_a", Vec2::new(0.05, -1.0), Vec2::new(5.0, 1.0)).unwrap();
    state.client_mut(a).unwrap().place(Vec2::ZERO);

    state.slow_tick(100);
    assert!(!state.world.level2_open);
    let b = spawn(&mut state, 2, 100);
    state.client_mut(b).unwrap().place(Vec2::new(-40.0, -40.0));
    state.slow_tick(200);
    assert!(state.world.level2_open);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::Level2Changed { open: true })), 1);

    state.client_mut(a).unwrap().client_target = Vec2::new(1.0, 0.0);
    state.fast_tick(240).unwrap();
    let client = state.client(a).unwrap();
    assert!(!client.is_stuck);
    assert!(client.position.x > 0.0);

    state.disconnect(b, "left", true, 300);
    state.slow_tick(400);
    assert!(!state.world.level2_open);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::Level2Changed { open: false })), 1);
}

#[test]
fn test_evolution_pays_points_and_caps_at_max_stage() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    state.client_mut(id).unwrap().xp = config.vitality.max_hp + 10.0;

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.avatar, 1);
    assert_eq!(client.evolves, 1);
    assert_eq!(client.points, config.game.points_per_evolve);
    assert!((client.xp - 10.0).abs() < 1e-9);
    assert_eq!(client.speed, config.vitality.speed_for(1));
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::UpdateEvolution { avatar: 1, .. })), 1);

    let max_stage = config.vitality.max_stage();
    {
        let client = state.client_mut(id).unwrap();
        client.avatar = max_stage;
        client.xp = config.vitality.max_hp * 2.0;
    }
    state.fast_tick(140).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.avatar, max_stage);
    assert_eq!(client.xp, client.max_hp);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::UpdateEvolution { .. })), 1);
}

#[test]
fn test_evolve_speed_burst() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    {
        let client = state.client_mut(id).unwrap();
        client.meta.set(Mechanic::EvolveSpeedBurstPercent, 50.0);
        client.xp = config.vitality.max_hp + 1.0;
    }

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.avatar, 1);
    assert!((client.effective_speed(100) - client.speed * 1.5).abs() < 1e-5);
    assert_eq!(client.effective_speed(100 + config.vitality.evolve_burst_ms), client.speed);
}

#[test]
fn test_empty_xp_regresses_a_stage() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    {
        let client = state.client_mut(id).unwrap();
        client.avatar = 2;
        client.xp = 0.0;
    }

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.state, LifeState::Alive);
    assert_eq!(client.avatar, 1);
    assert_eq!(client.xp, client.max_hp);
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::UpdateRegression { avatar: 1, .. })), 1);
}

#[test]
fn test_starvation_guards() {
    let mut config = quiet_config();
    config.game.immunity_seconds = 10;
    let mut state = new_state(&config);
    let immune = spawn(&mut state, 1, 0);
    let shielded = spawn(&mut state, 2, 0);
    for id in [immune, shielded] {
        state.client_mut(id).unwrap().xp = 0.0;
    }
    state.client_mut(shielded).unwrap().invincible_until = 20_000;
    state.client_mut(immune).unwrap().place(Vec2::new(-40.0, -40.0));
    state.client_mut(shielded).unwrap().place(Vec2::new(40.0, 40.0));

    state.fast_tick(5_000).unwrap();
    assert_eq!(state.client(immune).unwrap().state, LifeState::Alive);
    assert_eq!(state.client(shielded).unwrap().state, LifeState::Alive);

    // immunity runs out, invincibility does not
    state.fast_tick(10_000).unwrap();
    assert_eq!(state.client(immune).unwrap().state, LifeState::Disconnected);
    assert_eq!(state.client(shielded).unwrap().state, LifeState::Alive);

    let mut config = quiet_config();
    config.game.god_party = true;
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    state.client_mut(id).unwrap().xp = 0.0;
    state.fast_tick(100).unwrap();
    assert_eq!(state.client(id).unwrap().state, LifeState::Alive);
}

#[test]
fn test_corrupt_state_is_fatal() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let a = spawn(&mut state, 1, 0);
    let _b = spawn(&mut state, 2, 0);
    state.client_mut(a).unwrap().avatar = 200;

    let err = state.step(0).unwrap_err();
    assert!(matches!(err, SimulationError::Invariant { id, .. } if id == a));
    assert!(state.clients.is_empty());
}

#[test]
fn test_lowering_max_evolves_clamps_clients() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let moderator = connect_mod(&mut state, 0);
    let id = spawn(&mut state, 1, 0);
    state.client_mut(id).unwrap().avatar = 5;

    let set = |key: &str, value: &str| ModCommand::SetConfig { key: key.into(), value: value.into() };
    assert!(state.moderate(moderator, set("vitality.max_evolves", "0"), 10).is_err());
    assert_eq!(state.config.vitality.max_evolves, config.vitality.max_evolves);

    state.moderate(moderator, set("vitality.max_evolves", "3"), 10).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.avatar, 2);
    assert_eq!(client.speed, state.config.vitality.speed_for(2));

    state.step(40).unwrap();
    assert_eq!(state.client(id).unwrap().state, LifeState::Alive);
}

#[test]
fn test_loop_overrides_reach_the_scheduler() {
    let mut config = quiet_config();
    let mut overrides = toml::Table::new();
    let mut loops = toml::Table::new();
    loops.insert("round_loop_seconds".into(), toml::Value::Integer(10));
    overrides.insert("loops".into(), toml::Value::Table(loops));
    config.presets.push(PresetConfig { name: "short".into(), game_mode: "Deathmatch".into(), overrides });
    let mut state = new_state(&config);

    state.rotate_round(1000);
    assert_eq!(state.round.preset.as_deref(), Some("short"));
    assert_eq!(state.round.ends_at, 11_000);
    assert_eq!(state.scheduler.next_due(TaskKind::RoundRotation), Some(state.round.ends_at));

    let moderator = connect_mod(&mut state, 2000);
    let set = ModCommand::SetConfig { key: "loops.round_loop_seconds".into(), value: "20".into() };
    state.moderate(moderator, set, 2000).unwrap();
    assert_eq!(state.round.ends_at, 21_000);
    assert_eq!(state.scheduler.next_due(TaskKind::RoundRotation), Some(21_000));
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::SetRoundInfo { ends_at: 21_000, .. })), 1);
}

#[test]
fn test_orbs_and_rewards_expire() {
    let mut config = quiet_config();
    config.combat.orb_lifetime_ms = 1000;
    config.rewards.lifetime_ms = 1000;
    let mut state = new_state(&config);
    let round_id = state.round.id;
    state.world.schedule_orb(PendingOrb { round_id, spawn_at: 0, points: 5, position: Vec2::new(30.0, 30.0) });
    state.apply_reward_grant(RewardGrant { kind: "token".into(), quantity: 1 }, 0);
    let reward = state.world.reward.as_ref().unwrap().clone();
    assert_eq!(reward.expires_at, config.rewards.enable_delay_ms + 1000);

    state.fast_tick(40).unwrap();
    let orb = state.world.orbs[0].clone();
    assert_eq!(orb.expires_at, orb.enabled_at + 1000);

    state.fast_tick(orb.expires_at).unwrap();
    assert!(state.world.orbs.is_empty());
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::RemoveOrb { id } if *id == orb.id)), 1);
    assert!(state.world.reward.is_some());

    state.fast_tick(reward.expires_at).unwrap();
    assert!(state.world.reward.is_none());
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::RemoveReward { id } if *id == reward.id)), 1);

    // the free slot is offered to the realm again
    state.reward_tick(reward.expires_at + 1);
    assert!(state.take_realm_requests().iter().any(|r| matches!(r, RealmRequest::FetchReward)));
}

#[test]
fn test_collected_orb_is_removed() {
    let config = quiet_config();
    let mut state = new_state(&config);
    let id = spawn(&mut state, 1, 0);
    let position = state.client(id).unwrap().position;
    let orb = state.world.add_orb(5, 1.0, position, 0, 60_000);

    state.fast_tick(100).unwrap();
    let client = state.client(id).unwrap();
    assert_eq!(client.orbs, 1);
    assert_eq!(client.points, 5);
    assert!(state.world.orbs.is_empty());
    assert_eq!(logged(&state, |e| matches!(e, ServerEvent::RemoveOrb { id } if *id == orb.id)), 1);
}
