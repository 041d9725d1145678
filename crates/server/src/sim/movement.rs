//! Movement integration and collider policy.

use tracing::debug;

use crate::collision::{Contact, resolve_contact, step_toward};
use crate::server::GameState;

/// Contact immunity after the server disagrees with a claimed position.
const MISMATCH_PHASE_MS: u64 = 1000;
const STUCK_PHASE_MS: u64 = 3000;
const COLLIDED_PHASE_MS: u64 = 2000;
const PENALTY_MS: u64 = 1000;
const STUCK_SPEED_FACTOR: f32 = 0.02;
const COLLIDED_SPEED_FACTOR: f32 = 0.5;

impl GameState {
    /// Step every alive client toward its claimed target.
    pub(crate) fn resolve_movement(&mut self, now: u64, dt: f32) {
        let mut events = Vec::new();
        for id in self.alive_ids() {
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };

            if client.position.distance(client.client_position) > self.config.anticheat.check_position_distance {
                client.phase(now, MISMATCH_PHASE_MS);
                client.log.position_mismatch += 1;
                debug!(
                    "Client {} position mismatch: server {:?}, claimed {:?}",
                    id, client.position, client.client_position
                );
            }

            let from = client.position;
            let step = client.effective_speed(now) * dt;
            let (candidate, clamped) = self.world.border.clamp(step_toward(from, client.client_target, step));
            if clamped {
                client.log.out_of_bounds += 1;
            }

            let contact = if client.is_god {
                Contact::Clear
            } else {
                let kinds = self.world.colliders_at(candidate, &mut client.nearby);
                resolve_contact(&kinds, self.config.game.sticky_islands, self.world.level2_open)
            };

            let invincible = client.is_invincible(now);
            client.is_stuck = false;
            match contact {
                Contact::Clear => {
                    client.position = candidate;
                    client.target = client.client_target;
                }
                Contact::Stuck => {
                    client.position = candidate;
                    client.target = client.client_target;
                    client.is_stuck = true;
                    client.log.stuck += 1;
                    if !invincible {
                        client.override_speed_for(STUCK_SPEED_FACTOR, now, PENALTY_MS);
                        client.phase(now, STUCK_PHASE_MS);
                    }
                }
                Contact::Collided => {
                    client.position = from;
                    client.target = from;
                    client.client_target = from;
                    client.log.collided += 1;
                    if !invincible {
                        client.override_speed_for(COLLIDED_SPEED_FACTOR, now, PENALTY_MS);
                        client.phase(now, COLLIDED_PHASE_MS);
                    }
                }
            }
            events.push(client.update_event(now));
        }
        for event in events {
            self.emit(event, now);
        }
    }
}
