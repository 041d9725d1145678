//! Client admission, lifecycle and intent handling.

use protocol::packets::{ClientIntent, MAX_LABEL_LEN, ModCommand, ServerEvent};
use protocol::parse_point;
use tracing::{info, warn};

use super::client::{Client, Identity, LifeState};
use super::game::GameState;
use crate::error::IntentError;

impl GameState {
    /// Register a new session for an identity the transport already verified.
    pub fn connect(&mut self, identity: Identity, now: u64) -> u32 {
        let id = self.next_client_id();
        let client = Client::new(id, identity, &self.config, now);
        let hash = client.network_hash.clone();
        let is_mod = client.is_mod;
        info!("Client {} connected from {} as {:?}", id, client.address, client.name);
        self.clients.insert(id, client);

        let window_ms = self.config.anticheat.reconnect_window_seconds * 1000;
        let history = self.connect_history.entry(hash.clone()).or_default();
        history.retain(|&at| now.saturating_sub(at) < window_ms);
        history.push(now);
        let too_many = history.len() > self.config.anticheat.max_reconnects;

        if !is_mod {
            let duplicates: Vec<u32> = self
                .clients
                .values()
                .filter(|c| c.id != id && !c.is_mod && c.network_hash == hash)
                .filter(|c| c.state != LifeState::Disconnected)
                .map(|c| c.id)
                .collect();
            for other in duplicates {
                self.disconnect(other, "duplicate network", true, now);
            }
        }

        if too_many {
            if let Some(client) = self.clients.get_mut(&id) {
                client.log.reconnects += 1;
            }
            warn!("Client {} reconnected too often", id);
            self.disconnect(id, "too many reconnects", true, now);
        }
        id
    }

    /// Enter play, or the admission queue when full.
    pub fn join(&mut self, id: u32, now: u64) -> Result<(), IntentError> {
        let client = self.clients.get(&id).ok_or(IntentError::UnknownClient(id))?;
        match client.state {
            LifeState::Joining | LifeState::Alive => return Ok(()),
            LifeState::Disconnected => return Err(IntentError::NotPlaying),
            LifeState::Connecting | LifeState::Dead | LifeState::Spectating => {}
        }
        if self.queue.contains(&id) {
            return Ok(());
        }

        if self.admitted_count() >= self.config.game.max_clients {
            self.queue.push_back(id);
            let position = self.queue.len();
            if let Some(client) = self.clients.get_mut(&id) {
                client.state = LifeState::Spectating;
            }
            info!("Client {} queued at position {}", id, position);
            self.outbox.direct(id, ServerEvent::Queued { position });
            return Ok(());
        }

        self.force_join(id, now);
        Ok(())
    }

    /// Admit without a capacity check: fresh vitality, a spawn point and `Joining`.
    pub fn force_join(&mut self, id: u32, now: u64) {
        let position = self.world.spawn_position();
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        client.reset_vitality(&self.config);
        self.gamemode.on_spawn(client, &self.config);
        client.place(position);
        client.joined_at = now;
        client.touch(now);
        client.phased_until = 0;
        client.invincible_until = now + self.config.game.spawn_invincibility_ms;
        client.state = LifeState::Joining;
        self.round.add_participant(client);
        self.outbox.direct(id, ServerEvent::JoinGame { id, position });
    }

    /// Admit from the queue head while capacity allows.
    pub(crate) fn admit_from_queue(&mut self, now: u64) {
        while self.admitted_count() < self.config.game.max_clients {
            let Some(id) = self.queue.pop_front() else {
                break;
            };
            if self.clients.get(&id).is_some_and(|c| c.state == LifeState::Spectating) {
                info!("Client {} admitted from the queue", id);
                self.force_join(id, now);
            }
        }
        let remaining: Vec<u32> = self.queue.iter().copied().collect();
        for (idx, id) in remaining.into_iter().enumerate() {
            self.outbox.direct(id, ServerEvent::Queued { position: idx + 1 });
        }
    }

    /// Leave play (and the queue) to watch.
    pub fn spectate(&mut self, id: u32, now: u64) -> Result<(), IntentError> {
        let client = self.clients.get_mut(&id).ok_or(IntentError::UnknownClient(id))?;
        if client.state == LifeState::Disconnected {
            return Err(IntentError::NotPlaying);
        }
        let was_playing = client.state.is_admitted();
        client.state = LifeState::Spectating;
        client.is_stuck = false;
        self.queue.retain(|&q| q != id);
        self.emit(ServerEvent::Spectate { id }, now);
        if was_playing {
            self.admit_from_queue(now);
        }
        self.sync_sprites(now);
        Ok(())
    }

    /// Accept a claimed position and target. Malformed or out-of-bounds claims change nothing.
    pub fn update_myself(
        &mut self,
        id: u32,
        position: &str,
        target: &str,
        reported_time: u64,
        now: u64,
    ) -> Result<(), IntentError> {
        let parsed = parse_point(position).and_then(|p| Ok((p, parse_point(target)?)));
        let client = self.clients.get_mut(&id).ok_or(IntentError::UnknownClient(id))?;
        let (position, target) = match parsed {
            Ok(points) => points,
            Err(e) => {
                client.log.rejected_updates += 1;
                return Err(e.into());
            }
        };
        if !self.world.border.contains(position) || !self.world.border.contains(target) {
            client.log.rejected_updates += 1;
            return Err(IntentError::OutOfBounds);
        }
        if !client.state.is_admitted() {
            return Err(IntentError::NotPlaying);
        }

        let anticheat = &self.config.anticheat;
        if anticheat.disconnect_on_high_latency && now.saturating_sub(reported_time) > anticheat.max_latency_ms {
            client.log.high_latency += 1;
            warn!("Client {} latency {}ms over limit", id, now.saturating_sub(reported_time));
            self.disconnect(id, "high latency", false, now);
            return Err(IntentError::HighLatency);
        }

        client.client_position = position;
        client.client_target = target;
        client.touch(now);
        client.last_reported_time = reported_time;

        if client.state == LifeState::Joining {
            client.state = LifeState::Alive;
            let event = client.spawn_event();
            info!("Client {} spawned", id);
            self.emit(event, now);
            self.sync_sprites(now);
        }
        Ok(())
    }

    /// Drop a client. Repeated calls are no-ops, except that an immediate call
    /// brings a pending teardown forward.
    pub fn disconnect(&mut self, id: u32, reason: &str, immediate: bool, now: u64) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        if client.state == LifeState::Disconnected {
            if immediate && self.pending_teardowns.iter().any(|(pending, _)| *pending == id) {
                self.teardown(id, now);
            }
            return;
        }

        let was_playing = client.state.is_admitted();
        client.state = LifeState::Disconnected;
        client.is_stuck = false;
        self.queue.retain(|&q| q != id);
        info!("Client {} disconnected: {}", id, reason);
        self.emit(ServerEvent::Disconnected { id, reason: reason.to_string() }, now);
        if was_playing {
            self.admit_from_queue(now);
        }

        if immediate {
            self.teardown(id, now);
        } else {
            self.pending_teardowns.push((id, now + self.config.loops.teardown_delay_ms));
        }
    }

    /// Remove a client for good and close its socket.
    fn teardown(&mut self, id: u32, now: u64) {
        self.pending_teardowns.retain(|(pending, _)| *pending != id);
        if self.clients.remove(&id).is_some() {
            self.outbox.close(id);
            self.sync_sprites(now);
        }
    }

    /// Tear down every client whose delay has passed.
    pub(crate) fn process_teardowns(&mut self, now: u64) {
        let due: Vec<u32> = self
            .pending_teardowns
            .iter()
            .filter(|(_, at)| *at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in due {
            self.teardown(id, now);
        }
    }

    /// Send the full world state to one client.
    pub fn load(&mut self, id: u32, now: u64) -> Result<(), IntentError> {
        if !self.clients.contains_key(&id) {
            return Err(IntentError::UnknownClient(id));
        }
        let mut events = vec![self.round.info_event(), ServerEvent::Level2Changed { open: self.world.level2_open }];
        for client in self.clients.values().filter(|c| c.is_alive()) {
            events.push(client.spawn_event());
            events.push(client.update_event(now));
        }
        events.extend(self.world.powerups.iter().map(|p| p.spawn_event()));
        events.extend(self.world.orbs.iter().map(|o| o.spawn_event()));
        if let Some(reward) = &self.world.reward {
            events.push(reward.spawn_event());
        }
        events.push(ServerEvent::Leaderboard { rows: self.leaderboard() });
        if let Some(position) = self.queue_position(id) {
            events.push(ServerEvent::Queued { position });
        }
        for event in events {
            self.outbox.direct(id, event);
        }
        Ok(())
    }

    /// Spend one pending upgrade on an offered choice.
    pub fn choose_upgrade(&mut self, id: u32, choice: usize, now: u64) -> Result<(), IntentError> {
        let client = self.clients.get_mut(&id).ok_or(IntentError::UnknownClient(id))?;
        if client.upgrades_pending == 0 {
            return Err(IntentError::NoUpgradePending);
        }
        let upgrade = self.config.game.upgrades.get(choice).ok_or(IntentError::InvalidChoice(choice))?;
        client.meta.add(upgrade.mechanic, upgrade.value);
        client.upgrades_pending -= 1;
        info!("Client {} chose upgrade {:?}", id, upgrade.name);
        self.emit(ServerEvent::UpgradeChosen { id, choice }, now);
        Ok(())
    }

    pub fn emote(&mut self, id: u32, name: &str, now: u64) -> Result<(), IntentError> {
        self.require_present(id)?;
        let name = validate_label(name)?;
        self.emit(ServerEvent::Emote { id, name }, now);
        Ok(())
    }

    pub fn action(&mut self, id: u32, name: &str, now: u64) -> Result<(), IntentError> {
        self.require_present(id)?;
        let name = validate_label(name)?;
        self.emit(ServerEvent::Action { id, name }, now);
        Ok(())
    }

    /// Moderation tooling. The caller must carry the moderator flag.
    pub fn moderate(&mut self, id: u32, command: ModCommand, now: u64) -> Result<(), IntentError> {
        let client = self.clients.get(&id).ok_or(IntentError::UnknownClient(id))?;
        if !client.is_mod {
            warn!("Client {} sent a moderation command without the flag", id);
            return Err(IntentError::NotAuthorized);
        }
        match command {
            ModCommand::SetConfig { key, value } => {
                self.config.set_override(&key, &value)?;
                info!("Moderator {} set {} = {}", id, key, value);
                self.apply_live_config(now);
            }
            ModCommand::Kick { client_id } => {
                info!("Moderator {} kicked {}", id, client_id);
                self.disconnect(client_id, "kicked", true, now);
            }
            ModCommand::RotateRound => {
                info!("Moderator {} rotated the round", id);
                self.rotate_round(now);
            }
            ModCommand::Broadcast { message } => {
                self.emit(ServerEvent::Broadcast { message, notice: false }, now);
            }
            ModCommand::ToggleGod { client_id } => {
                let target = self.clients.get_mut(&client_id).ok_or(IntentError::UnknownClient(client_id))?;
                target.is_god = !target.is_god;
                info!("Moderator {} set god mode of {} to {}", id, client_id, target.is_god);
            }
        }
        Ok(())
    }

    /// Dispatch one decoded intent.
    pub fn handle_intent(&mut self, id: u32, intent: ClientIntent, now: u64) -> Result<(), IntentError> {
        match intent {
            ClientIntent::Join => self.join(id, now),
            ClientIntent::Spectate => self.spectate(id, now),
            ClientIntent::UpdateMyself { position, target, time } => {
                self.update_myself(id, &position, &target, time, now)
            }
            ClientIntent::Load => self.load(id, now),
            ClientIntent::ChooseUpgrade { choice } => self.choose_upgrade(id, choice, now),
            ClientIntent::Emote { name } => self.emote(id, &name, now),
            ClientIntent::Action { name } => self.action(id, &name, now),
            ClientIntent::Moderate(command) => self.moderate(id, command, now),
        }
    }

    /// Decode and dispatch a raw frame.
    pub fn handle_message(&mut self, id: u32, data: &[u8], now: u64) -> Result<(), IntentError> {
        let intent = ClientIntent::parse(data)?;
        self.handle_intent(id, intent, now)
    }

    fn require_present(&self, id: u32) -> Result<(), IntentError> {
        match self.clients.get(&id) {
            None => Err(IntentError::UnknownClient(id)),
            Some(c) if c.state == LifeState::Disconnected => Err(IntentError::NotPlaying),
            Some(_) => Ok(()),
        }
    }
}

/// Emote and action names: 1 to `MAX_LABEL_LEN` characters of `[A-Za-z0-9_]`.
fn validate_label(name: &str) -> Result<String, IntentError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_LABEL_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(IntentError::InvalidLabel(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_label() {
        assert!(validate_label("wave").is_ok());
        assert!(validate_label("big_wave2").is_ok());
        assert!(validate_label("").is_err());
        assert!(validate_label("no spaces").is_err());
        assert!(validate_label(&"x".repeat(MAX_LABEL_LEN + 1)).is_err());
    }
}
