//! Sprite, orb and reward collection.

use protocol::packets::{PickupKind, ServerEvent};
use tracing::{debug, info};

use crate::entity::RewardClaim;
use crate::mechanics::Mechanic;
use crate::server::GameState;

impl GameState {
    pub(crate) fn resolve_pickups(&mut self, now: u64) {
        for id in self.alive_ids() {
            let Some(client) = self.clients.get(&id) else {
                continue;
            };
            if !client.is_alive() || client.is_phased(now) {
                continue;
            }
            let position = client.position;
            let radius = self.config.pickup.pickup_distance + client.touch_radius(&self.config);

            for sprite_id in self.world.sprite_grid.find_in_radius(position, radius) {
                self.collect_sprite(id, sprite_id, now);
            }

            let invincible = self.clients.get(&id).is_some_and(|c| c.is_invincible(now));
            if !invincible {
                for orb_id in self.world.orb_grid.find_in_radius(position, radius) {
                    self.collect_orb(id, orb_id, now);
                }
            }

            let reward_in_reach = self
                .world
                .reward
                .as_ref()
                .is_some_and(|r| r.is_enabled(now) && r.position.distance(position) <= radius);
            if reward_in_reach {
                self.claim_reward(id, now);
            }
        }
    }

    fn collect_sprite(&mut self, client_id: u32, sprite_id: u32, now: u64) {
        let Some(sprite) = self.world.remove_powerup(sprite_id) else {
            return;
        };
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        self.gamemode.on_sprite_pickup(client, &sprite, now, &self.config);

        let pickup = &self.config.pickup;
        let base = pickup.sprite_xp[sprite.kind as usize % pickup.sprite_xp.len()];
        let value = base
            * pickup.sprite_xp_multiplier
            * self.gamemode.sprite_xp_multiplier()
            * client.meta.percent_modifier(Mechanic::SpriteValueIncreasePercent, Mechanic::SpriteValueDecreasePercent);
        client.xp += value;
        client.points += self.config.game.points_per_sprite;
        client.powerups += 1;

        self.emit(
            ServerEvent::UpdatePickup { client_id, pickup_id: sprite_id, kind: PickupKind::Sprite, value },
            now,
        );
        self.emit(ServerEvent::RemovePowerUp { id: sprite_id }, now);
        let replacement = self.world.spawn_powerup(self.config.pickup.sprite_scale);
        self.emit(replacement.spawn_event(), now);
        self.sync_sprites(now);
    }

    fn collect_orb(&mut self, client_id: u32, orb_id: u32, now: u64) {
        let enabled = self.world.orbs.iter().any(|o| o.id == orb_id && o.is_enabled(now));
        if !enabled {
            return;
        }
        let Some(orb) = self.world.remove_orb(orb_id) else {
            return;
        };
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        client.points += orb.points;
        client.orbs += 1;
        debug!("Client {} collected orb {} worth {}", client_id, orb_id, orb.points);
        self.emit(
            ServerEvent::UpdatePickup {
                client_id,
                pickup_id: orb_id,
                kind: PickupKind::Orb,
                value: orb.points as f64,
            },
            now,
        );
        self.emit(ServerEvent::RemoveOrb { id: orb_id }, now);
    }

    /// Claim the live reward. The previous winner cannot claim twice in a row.
    fn claim_reward(&mut self, client_id: u32, now: u64) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        if self.config.anticheat.same_client_cant_claim_reward_twice_in_row
            && self.round.last_reward_winner() == Some(client.address.as_str())
        {
            return;
        }
        let Some(mut reward) = self.world.reward.take() else {
            return;
        };

        let mut quantity = reward.quantity;
        if client.meta.roll(Mechanic::DoublePickupChance, &mut self.world.rng) {
            quantity *= 2;
        }
        client.rewards += 1;
        client.points += self.config.game.points_per_reward;
        reward.winner = Some(client.address.clone());

        self.round.claims.push(RewardClaim {
            reward_id: reward.id,
            address: client.address.clone(),
            name: client.name.clone(),
            kind: reward.kind.clone(),
            quantity,
            claimed_at: now,
        });

        info!("Client {} claimed reward {} ({} x{})", client_id, reward.id, reward.kind, quantity);
        let event = ServerEvent::RewardWinner {
            client_id,
            name: client.name.clone(),
            reward_id: reward.id,
            quantity,
        };
        self.emit(event, now);
        self.emit(ServerEvent::RemoveReward { id: reward.id }, now);
        self.round.last_reward = Some(reward);
    }
}
