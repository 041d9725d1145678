use super::GameMode;
use crate::config::Config;
use crate::entity::PowerUp;
use crate::server::client::Client;

pub(super) const SPEED_BOOST_FACTOR: f32 = 1.5;
pub(super) const SPEED_BOOST_MS: u64 = 3000;
const CAMERA_STEP: f32 = 0.1;
const DECAY_FACTOR: f64 = 0.9;
const MIN_DECAY_POWER: f64 = 0.5;

/// Each sprite type carries a side effect.
pub struct SpriteJuice;

impl GameMode for SpriteJuice {
    fn name(&self) -> &'static str {
        "SpriteJuice"
    }

    fn on_sprite_pickup(&self, client: &mut Client, sprite: &PowerUp, now: u64, _config: &Config) {
        match sprite.kind {
            1 => client.override_speed_for(SPEED_BOOST_FACTOR, now, SPEED_BOOST_MS),
            2 => client.camera_size += CAMERA_STEP,
            3 => client.decay_power = (client.decay_power * DECAY_FACTOR).max(MIN_DECAY_POWER),
            _ => {}
        }
    }
}
