//! Character mechanic modifiers.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric modifiers a character can carry. Percent values are in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanic {
    DecayIncreasePercent,
    DecayDecreasePercent,
    SpriteValueIncreasePercent,
    SpriteValueDecreasePercent,
    EvolveSpeedBurstPercent,
    AvoidDeathPenaltyChance,
    DoublePickupChance,
}

/// Mechanic -> value map.
#[derive(Debug, Clone, Default)]
pub struct MechanicMap {
    values: HashMap<Mechanic, f64>,
}

impl MechanicMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the mechanic is present with a positive value.
    pub fn has(&self, mechanic: Mechanic) -> bool {
        self.get(mechanic) > 0.0
    }

    pub fn get(&self, mechanic: Mechanic) -> f64 {
        self.values.get(&mechanic).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, mechanic: Mechanic, value: f64) {
        self.values.insert(mechanic, value);
    }

    pub fn add(&mut self, mechanic: Mechanic, delta: f64) {
        *self.values.entry(mechanic).or_insert(0.0) += delta;
    }

    /// Multiplier from an increase/decrease pair: `1 + (inc - dec) / 100`, never negative.
    pub fn percent_modifier(&self, increase: Mechanic, decrease: Mechanic) -> f64 {
        (1.0 + (self.get(increase) - self.get(decrease)) / 100.0).max(0.0)
    }

    /// Roll a percent chance mechanic.
    pub fn roll(&self, mechanic: Mechanic, rng: &mut impl Rng) -> bool {
        if !self.has(mechanic) {
            return false;
        }
        let chance = (self.get(mechanic) / 100.0).clamp(0.0, 1.0);
        rng.random_bool(chance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_percent_modifier_pair() {
        let mut meta = MechanicMap::new();
        assert_eq!(meta.percent_modifier(Mechanic::DecayIncreasePercent, Mechanic::DecayDecreasePercent), 1.0);
        meta.set(Mechanic::DecayIncreasePercent, 30.0);
        meta.set(Mechanic::DecayDecreasePercent, 10.0);
        let m = meta.percent_modifier(Mechanic::DecayIncreasePercent, Mechanic::DecayDecreasePercent);
        assert!((m - 1.2).abs() < 1e-9);
        meta.set(Mechanic::DecayDecreasePercent, 500.0);
        assert_eq!(meta.percent_modifier(Mechanic::DecayIncreasePercent, Mechanic::DecayDecreasePercent), 0.0);
    }

    #[test]
    fn test_roll_edges() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut meta = MechanicMap::new();
        assert!(!meta.roll(Mechanic::DoublePickupChance, &mut rng));
        meta.set(Mechanic::DoublePickupChance, 100.0);
        assert!(meta.roll(Mechanic::DoublePickupChance, &mut rng));
        meta.set(Mechanic::DoublePickupChance, -5.0);
        assert!(!meta.has(Mechanic::DoublePickupChance));
    }
}
