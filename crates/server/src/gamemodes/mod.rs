use crate::config::Config;
use crate::entity::PowerUp;
use crate::server::client::Client;

pub mod deathmatch;
pub mod fast_drake;
pub mod marco_polo;
pub mod sprite_juice;
pub mod standard;

/// Names accepted by [`get_gamemode`], in rotation fallback order.
pub const GAME_MODES: [&str; 5] = ["Standard", "Deathmatch", "SpriteJuice", "FastDrake", "MarcoPolo"];

/// Side effects that vary by round mode.
pub trait GameMode: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called after a client's vitality was reset for a fresh spawn.
    fn on_spawn(&self, _client: &mut Client, _config: &Config) {}

    /// Called for every collected sprite, before its xp is credited.
    fn on_sprite_pickup(&self, _client: &mut Client, _sprite: &PowerUp, _now: u64, _config: &Config) {}

    /// Xp granted to the winner of a kill.
    fn kill_xp_bonus(&self, base: f64) -> f64 {
        base
    }

    /// Extra multiplier on sprite xp.
    fn sprite_xp_multiplier(&self) -> f64 {
        1.0
    }
}

pub fn get_gamemode(name: &str) -> Box<dyn GameMode> {
    match name {
        "Deathmatch" => Box::new(deathmatch::Deathmatch),
        "SpriteJuice" => Box::new(sprite_juice::SpriteJuice),
        "FastDrake" => Box::new(fast_drake::FastDrake),
        "MarcoPolo" => Box::new(marco_polo::MarcoPolo),
        _ => Box::new(standard::Standard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        for name in GAME_MODES {
            assert_eq!(get_gamemode(name).name(), name);
        }
        assert_eq!(get_gamemode("NoSuchMode").name(), "Standard");
    }
}
