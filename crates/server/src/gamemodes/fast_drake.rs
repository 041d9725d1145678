use super::GameMode;
use super::sprite_juice::{SPEED_BOOST_FACTOR, SPEED_BOOST_MS};
use crate::config::Config;
use crate::entity::PowerUp;
use crate::server::client::Client;

const BASE_SPEED: f32 = 1.5;

/// Everyone moves faster; speed sprites stack a burst on top.
pub struct FastDrake;

impl GameMode for FastDrake {
    fn name(&self) -> &'static str {
        "FastDrake"
    }

    fn on_spawn(&self, client: &mut Client, config: &Config) {
        client.base_speed = BASE_SPEED;
        client.recompute_speed(config);
    }

    fn on_sprite_pickup(&self, client: &mut Client, sprite: &PowerUp, now: u64, _config: &Config) {
        if sprite.kind == 1 {
            client.override_speed_for(SPEED_BOOST_FACTOR, now, SPEED_BOOST_MS);
        }
    }
}
