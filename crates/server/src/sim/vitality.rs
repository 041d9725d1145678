//! Xp decay, evolution, regression and starvation.

use protocol::packets::ServerEvent;
use tracing::debug;

use super::KillOutcome;
use crate::mechanics::Mechanic;
use crate::server::GameState;

impl GameState {
    pub(crate) fn resolve_vitality(&mut self, now: u64, dt: f64) {
        let decay_power = self.global_decay_power();
        let mut events = Vec::new();
        let mut starving = Vec::new();

        for id in self.alive_ids() {
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            let vitality = &self.config.vitality;

            if client.xp > client.max_hp {
                if client.avatar < vitality.max_stage() {
                    client.xp -= client.max_hp;
                    client.avatar += 1;
                    client.points += self.config.game.points_per_evolve;
                    client.evolves += 1;
                    client.recompute_speed(&self.config);
                    if client.meta.has(Mechanic::EvolveSpeedBurstPercent) {
                        let factor = 1.0 + client.meta.get(Mechanic::EvolveSpeedBurstPercent) / 100.0;
                        client.override_speed_for(factor as f32, now, vitality.evolve_burst_ms);
                    }
                    if self.config.game.upgrades_enabled {
                        client.upgrades_pending += 1;
                    }
                    debug!("Client {} evolved to stage {}", id, client.avatar);
                    events.push(ServerEvent::UpdateEvolution { id, avatar: client.avatar, speed: client.speed });
                } else {
                    client.xp = client.max_hp;
                }
            } else if !client.is_invincible(now) && !vitality.no_decay {
                let modifier =
                    client.meta.percent_modifier(Mechanic::DecayIncreasePercent, Mechanic::DecayDecreasePercent);
                let decay = (client.avatar as f64 + 1.0)
                    * dt
                    * vitality.decay_power_for(client.avatar)
                    * decay_power
                    * client.decay_power
                    * modifier;
                client.xp -= decay;
            }

            if client.xp <= 0.0 {
                client.xp = 0.0;
                if client.avatar > 0 {
                    client.avatar -= 1;
                    client.xp = client.max_hp;
                    client.recompute_speed(&self.config);
                    debug!("Client {} regressed to stage {}", id, client.avatar);
                    events.push(ServerEvent::UpdateRegression { id, avatar: client.avatar, speed: client.speed });
                } else {
                    starving.push(id);
                }
            }
        }

        for event in events {
            self.emit(event, now);
        }
        for id in starving {
            self.starve(id, now);
        }
    }

    /// A stage-0 client ran out of xp.
    fn starve(&mut self, id: u32, now: u64) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        let immune = now.saturating_sub(client.joined_at) < self.config.game.immunity_seconds * 1000;
        if immune || self.config.game.god_party || client.is_invincible(now) {
            return;
        }

        let toucher = client
            .last_touch
            .filter(|(_, at)| now.saturating_sub(*at) < self.config.combat.last_touch_window_ms)
            .map(|(other, _)| other)
            .filter(|other| self.clients.get(other).is_some_and(|c| c.is_alive()));
        if let Some(toucher) = toucher {
            if self.credit_starvation(toucher, id, now) == KillOutcome::Killed {
                return;
            }
        }
        self.disconnect(id, "starved", false, now);
    }
}
