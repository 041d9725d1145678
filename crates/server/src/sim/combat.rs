//! Contact combat with anti-feed gating.
//!
//! Every touching pair of alive, non-invincible clients produces a kill
//! attempt each tick. The scan is O(n²) in the alive count.

use protocol::packets::ServerEvent;
use tracing::{debug, info, warn};

use crate::collision::check_contact;
use crate::entity::PendingOrb;
use crate::mechanics::Mechanic;
use crate::server::GameState;
use crate::server::client::{Client, LifeState};

/// What a kill attempt resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// A precondition failed; nothing changed.
    Aborted,
    /// Refused by the kill-rate check; only the cheat log changed.
    Blocked,
    /// Both sides took damage, nobody died.
    Damaged,
    Killed,
}

/// Gate verdict ahead of damage.
enum KillGate {
    Abort,
    Block,
    Proceed { no_payout: bool },
}

impl GameState {
    /// Scan all touching pairs once.
    pub(crate) fn resolve_combat(&mut self, now: u64) {
        let ids: Vec<u32> = self
            .clients
            .values()
            .filter(|c| c.is_alive() && !c.is_invincible(now))
            .map(|c| c.id)
            .collect();
        if ids.len() < 2 {
            return;
        }
        self.combat_dead.clear();
        self.combat_dead.grow(ids.len());

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if self.combat_dead.contains(i) {
                    break;
                }
                if self.combat_dead.contains(j) {
                    continue;
                }
                let (Some(a), Some(b)) = (self.clients.get(&ids[i]), self.clients.get(&ids[j])) else {
                    continue;
                };
                let contact = check_contact(
                    a.position,
                    a.touch_radius(&self.config),
                    b.position,
                    b.touch_radius(&self.config),
                );
                if !contact.is_touching() {
                    continue;
                }
                let (winner, loser) = if attacks(a, b) { (a, b) } else { (b, a) };
                if loser.is_phased(now) {
                    continue;
                }
                let (winner, loser) = (winner.id, loser.id);
                if self.register_kill(winner, loser, now) == KillOutcome::Killed {
                    let dead = if loser == ids[i] { i } else { j };
                    self.combat_dead.insert(dead);
                }
            }
        }
    }

    /// One kill attempt of `winner_id` on `loser_id`.
    pub fn register_kill(&mut self, winner_id: u32, loser_id: u32, now: u64) -> KillOutcome {
        let no_payout = match self.kill_gate(winner_id, loser_id, now) {
            KillGate::Abort => return KillOutcome::Aborted,
            KillGate::Block => return KillOutcome::Blocked,
            KillGate::Proceed { no_payout } => no_payout,
        };

        let combat = &self.config.combat;
        for (id, other) in [(winner_id, loser_id), (loser_id, winner_id)] {
            if let Some(client) = self.clients.get_mut(&id) {
                client.xp = (client.xp - combat.damage_per_touch).max(0.0);
                client.override_speed_for(combat.touch_slowdown_factor, now, combat.touch_slowdown_ms);
                client.last_touch = Some((other, now));
            }
        }

        let dies = self.clients.get(&loser_id).is_some_and(|c| c.avatar == 0 && c.xp <= 0.0);
        if !dies {
            return KillOutcome::Damaged;
        }
        self.finish_kill(winner_id, loser_id, no_payout, now);
        KillOutcome::Killed
    }

    /// A starvation death credited to the last toucher. Gated like a contact
    /// kill but without another round of damage.
    pub(crate) fn credit_starvation(&mut self, winner_id: u32, loser_id: u32, now: u64) -> KillOutcome {
        match self.kill_gate(winner_id, loser_id, now) {
            KillGate::Abort => KillOutcome::Aborted,
            KillGate::Block => KillOutcome::Blocked,
            KillGate::Proceed { no_payout } => {
                self.finish_kill(winner_id, loser_id, no_payout, now);
                KillOutcome::Killed
            }
        }
    }

    fn kill_gate(&mut self, winner_id: u32, loser_id: u32, now: u64) -> KillGate {
        if winner_id == loser_id || self.config.game.god_party {
            return KillGate::Abort;
        }
        let alive = self.alive_count().max(1);
        let (Some(winner), Some(loser)) = (self.clients.get(&winner_id), self.clients.get(&loser_id)) else {
            return KillGate::Abort;
        };
        if !winner.is_alive()
            || !loser.is_alive()
            || winner.is_invincible(now)
            || loser.is_invincible(now)
            || loser.is_god
        {
            return KillGate::Abort;
        }
        if self.config.combat.prevent_bad_kills && winner.is_phased(now) {
            return KillGate::Abort;
        }

        let anticheat = &self.config.anticheat;
        let total_kills = winner.kill_log.iter().filter(|hash| **hash == loser.network_hash).count();
        let not_trying =
            anticheat.anti_feed_not_trying && total_kills >= 2 && loser.kills < 2 && loser.rewards <= 1;
        let kill_rate = anticheat.anti_feed_kill_rate
            && total_kills >= anticheat.too_many_kills_threshold
            && total_kills as f64 > winner.kill_log.len() as f64 / alive as f64;
        let same_network = anticheat.anti_feed_self_hash && winner.network_hash == loser.network_hash;

        if not_trying || kill_rate {
            if let Some(loser) = self.clients.get_mut(&loser_id) {
                if not_trying {
                    loser.log.not_really_trying += 1;
                }
                if kill_rate {
                    loser.log.too_many_kills += 1;
                }
            }
        }
        if kill_rate {
            warn!("Kill of {} by {} blocked: {} repeat kills", loser_id, winner_id, total_kills);
            return KillGate::Block;
        }
        if not_trying {
            debug!("Kill of {} by {} pays nothing: victim not trying", loser_id, winner_id);
        }
        if same_network {
            if let Some(winner) = self.clients.get_mut(&winner_id) {
                winner.log.killing_themselves += 1;
            }
            warn!("Client {} killed {} from the same network", winner_id, loser_id);
        }
        KillGate::Proceed { no_payout: not_trying }
    }

    fn finish_kill(&mut self, winner_id: u32, loser_id: u32, no_payout: bool, now: u64) {
        let kill_bonus = self.gamemode.kill_xp_bonus(self.config.combat.kill_xp_bonus);
        let Some(loser_hash) = self.clients.get(&loser_id).map(|c| c.network_hash.clone()) else {
            return;
        };
        if let Some(winner) = self.clients.get_mut(&winner_id) {
            winner.kills += 1;
            winner.kill_streak += 1;
            winner.kill_log.push(loser_hash);
            if !no_payout {
                winner.points += self.config.game.points_per_kill;
            }
            winner.xp = (winner.xp + kill_bonus).min(winner.max_hp);
        }

        let Some(loser) = self.clients.get_mut(&loser_id) else {
            return;
        };
        loser.deaths += 1;
        loser.kill_streak = 0;
        loser.is_stuck = false;
        loser.state = LifeState::Dead;

        let avoided = !no_payout && loser.meta.roll(Mechanic::AvoidDeathPenaltyChance, &mut self.world.rng);
        if !no_payout && !avoided {
            let orb_points = (loser.points as f64 * self.config.combat.orb_on_death_percent / 100.0).floor() as u64;
            if orb_points > 0 {
                loser.points -= orb_points.min(loser.points);
                self.world.schedule_orb(PendingOrb {
                    round_id: self.round.id,
                    spawn_at: now + self.config.combat.orb_timeout_ms,
                    points: orb_points,
                    position: loser.position,
                });
            }
        }

        info!("Client {} killed client {}", winner_id, loser_id);
        self.emit(ServerEvent::GameOver { loser: loser_id, winner: winner_id }, now);
        self.admit_from_queue(now);
        self.sync_sprites(now);
    }
}

/// Whether `a` is the attacker: higher stage, then more xp, then lower id.
fn attacks(a: &Client, b: &Client) -> bool {
    if a.avatar != b.avatar {
        return a.avatar > b.avatar;
    }
    if a.xp != b.xp {
        return a.xp > b.xp;
    }
    a.id < b.id
}
