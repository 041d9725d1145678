use super::GameMode;
use crate::config::Config;
use crate::entity::PowerUp;
use crate::server::client::Client;

const SPAWN_CAMERA: f32 = 0.8;
const CAMERA_STEP: f32 = 0.2;

/// Short sight; camera sprites widen it.
pub struct MarcoPolo;

impl GameMode for MarcoPolo {
    fn name(&self) -> &'static str {
        "MarcoPolo"
    }

    fn on_spawn(&self, client: &mut Client, _config: &Config) {
        client.camera_size = SPAWN_CAMERA;
    }

    fn on_sprite_pickup(&self, client: &mut Client, sprite: &PowerUp, _now: u64, _config: &Config) {
        if sprite.kind == 2 {
            client.camera_size += CAMERA_STEP;
        }
    }
}
