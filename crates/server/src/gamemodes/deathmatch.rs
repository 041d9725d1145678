use super::GameMode;

/// Kills pay double, sprites half.
pub struct Deathmatch;

impl GameMode for Deathmatch {
    fn name(&self) -> &'static str {
        "Deathmatch"
    }

    fn kill_xp_bonus(&self, base: f64) -> f64 {
        base * 2.0
    }

    fn sprite_xp_multiplier(&self) -> f64 {
        0.5
    }
}
