//! World state management.
//!
//! Owns every non-client object: sprites, orbs, the reward slot and static
//! colliders, each mirrored in a spatial grid.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::warn;

use crate::config::WorldConfig;
use crate::entity::{ColliderKind, Orb, PendingOrb, PowerUp, Reward, SPRITE_KINDS, StaticCollider};
use crate::spatial::{GridIndex, NearbyCache};

/// Attempts at finding a spawn point outside every collider.
const FREE_POSITION_ATTEMPTS: usize = 32;

/// World border bounds.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub width: f32,
    pub height: f32,
}

impl WorldBorder {
    pub fn new(width: f32, height: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self {
            min_x: -half_w,
            min_y: -half_h,
            max_x: half_w,
            max_y: half_h,
            width,
            height,
        }
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Clamp a point into the border. The flag is set when clamping moved it.
    #[inline]
    pub fn clamp(&self, p: Vec2) -> (Vec2, bool) {
        let clamped = p.clamp(Vec2::new(self.min_x, self.min_y), Vec2::new(self.max_x, self.max_y));
        (clamped, clamped != p)
    }

    /// Get a random position within the border.
    #[inline]
    pub fn random_position(&self, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            rng.random_range(self.min_x..=self.max_x),
            rng.random_range(self.min_y..=self.max_y),
        )
    }
}

/// Delays applied to a released orb.
#[derive(Debug, Clone, Copy)]
pub struct OrbTiming {
    pub enable_delay_ms: u64,
    /// Counted from the moment the orb becomes collectible.
    pub lifetime_ms: u64,
}

/// Ids removed by an expiry sweep.
#[derive(Debug, Default, PartialEq)]
pub struct Expired {
    pub orbs: Vec<u32>,
    pub reward: Option<u32>,
}

/// The game world.
#[derive(Debug)]
pub struct World {
    next_id: u32,

    pub border: WorldBorder,

    pub powerups: Vec<PowerUp>,
    powerup_pos: HashMap<u32, usize>,

    pub orbs: Vec<Orb>,
    orb_pos: HashMap<u32, usize>,
    pub pending_orbs: Vec<PendingOrb>,

    /// The singleton reward slot.
    pub reward: Option<Reward>,

    pub colliders: Vec<StaticCollider>,
    collider_pos: HashMap<u32, usize>,

    pub sprite_grid: GridIndex,
    pub orb_grid: GridIndex,
    pub collider_grid: GridIndex,

    /// Whether `Level2Divider*` colliders let clients through.
    pub level2_open: bool,

    spawn_points: Vec<Vec2>,
    reward_spawn_points: Vec<Vec2>,

    pub rng: StdRng,
}

impl World {
    /// Create a world from map geometry. `seed` makes every random choice reproducible.
    pub fn new(config: &WorldConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let cell_size = config.grid_cell_size;
        let mut world = Self {
            next_id: 1,
            border: WorldBorder::new(config.width, config.height),
            powerups: Vec::with_capacity(64),
            powerup_pos: HashMap::with_capacity(64),
            orbs: Vec::new(),
            orb_pos: HashMap::new(),
            pending_orbs: Vec::new(),
            reward: None,
            colliders: Vec::with_capacity(config.colliders.len()),
            collider_pos: HashMap::with_capacity(config.colliders.len()),
            sprite_grid: GridIndex::new(cell_size),
            orb_grid: GridIndex::new(cell_size),
            collider_grid: GridIndex::new(cell_size),
            level2_open: false,
            spawn_points: config.spawn_points.clone(),
            reward_spawn_points: config.reward_spawn_points.clone(),
            rng,
        };
        for collider in &config.colliders {
            if world.add_collider(&collider.name, collider.min, collider.max).is_none() {
                warn!("Ignoring collider with unknown prefix: {}", collider.name);
            }
        }
        world
    }

    /// Get the next object ID. Never returns 0.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1;
        }
        id
    }

    /// Add a static collider. Returns `None` for an unknown name prefix.
    pub fn add_collider(&mut self, name: &str, a: Vec2, b: Vec2) -> Option<u32> {
        let id = self.next_id();
        let collider = StaticCollider::new(id, name, a, b)?;
        self.collider_grid.insert_rect(id, collider.min, collider.max);
        self.collider_pos.insert(id, self.colliders.len());
        self.colliders.push(collider);
        Some(id)
    }

    /// Collider kinds covering `point`, looked up through the client's memo.
    pub fn colliders_at(&self, point: Vec2, cache: &mut NearbyCache) -> Vec<ColliderKind> {
        cache
            .candidates(&self.collider_grid, point)
            .iter()
            .filter_map(|id| self.collider_pos.get(id).map(|&idx| &self.colliders[idx]))
            .filter(|collider| collider.contains(point))
            .map(|collider| collider.kind)
            .collect()
    }

    fn inside_collider(&self, point: Vec2) -> bool {
        let key = self.collider_grid.cell_of(point);
        self.collider_grid
            .in_cell(key)
            .iter()
            .filter_map(|id| self.collider_pos.get(id).map(|&idx| &self.colliders[idx]))
            .any(|collider| collider.contains(point))
    }

    /// A random point inside the border and outside every collider, when one is found.
    pub fn random_free_position(&mut self) -> Vec2 {
        let mut candidate = self.border.random_position(&mut self.rng);
        for _ in 1..FREE_POSITION_ATTEMPTS {
            if !self.inside_collider(candidate) {
                break;
            }
            candidate = self.border.random_position(&mut self.rng);
        }
        candidate
    }

    /// Where a joining client appears.
    pub fn spawn_position(&mut self) -> Vec2 {
        if self.spawn_points.is_empty() {
            return self.random_free_position();
        }
        let idx = self.rng.random_range(0..self.spawn_points.len());
        self.border.clamp(self.spawn_points[idx]).0
    }

    /// Spawn one sprite of a random type.
    pub fn spawn_powerup(&mut self, scale: f32) -> PowerUp {
        let id = self.next_id();
        let kind = self.rng.random_range(0..SPRITE_KINDS);
        let position = self.random_free_position();
        let powerup = PowerUp::new(id, kind, position, scale);
        self.sprite_grid.insert_circle(id, position, powerup.radius());
        self.powerup_pos.insert(id, self.powerups.len());
        self.powerups.push(powerup.clone());
        powerup
    }

    /// Remove a sprite. Removing an unknown id is a no-op.
    pub fn remove_powerup(&mut self, id: u32) -> Option<PowerUp> {
        let removed = swap_remove_by_id(&mut self.powerups, &mut self.powerup_pos, id, |p| p.id)?;
        self.sprite_grid.remove(id);
        Some(removed)
    }

    /// Grow or shrink the sprite pool to exactly `target`.
    pub fn sync_powerups(&mut self, target: usize, scale: f32) -> (Vec<PowerUp>, Vec<u32>) {
        let mut spawned = Vec::new();
        let mut removed = Vec::new();
        while self.powerups.len() < target {
            spawned.push(self.spawn_powerup(scale));
        }
        while self.powerups.len() > target {
            let Some(id) = self.powerups.last().map(|p| p.id) else {
                break;
            };
            self.remove_powerup(id);
            removed.push(id);
        }
        (spawned, removed)
    }

    /// Place an orb in the world.
    pub fn add_orb(&mut self, points: u64, scale: f32, position: Vec2, enabled_at: u64, expires_at: u64) -> Orb {
        let id = self.next_id();
        let orb = Orb { id, points, scale, position, enabled_at, expires_at };
        self.orb_grid.insert_circle(id, position, orb.radius());
        self.orb_pos.insert(id, self.orbs.len());
        self.orbs.push(orb.clone());
        orb
    }

    /// Remove an orb. Removing an unknown id is a no-op.
    pub fn remove_orb(&mut self, id: u32) -> Option<Orb> {
        let removed = swap_remove_by_id(&mut self.orbs, &mut self.orb_pos, id, |o| o.id)?;
        self.orb_grid.remove(id);
        Some(removed)
    }

    pub fn schedule_orb(&mut self, pending: PendingOrb) {
        self.pending_orbs.push(pending);
    }

    /// Spawn pending orbs that are due. Orbs scheduled in another round are dropped.
    pub fn release_due_orbs(&mut self, round_id: u64, now: u64, scale: f32, timing: OrbTiming) -> Vec<Orb> {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending_orbs.drain(..).partition(|pending| pending.spawn_at <= now);
        self.pending_orbs = waiting;
        due.into_iter()
            .filter(|pending| pending.round_id == round_id)
            .map(|pending| {
                let enabled_at = now + timing.enable_delay_ms;
                self.add_orb(pending.points, scale, pending.position, enabled_at, enabled_at + timing.lifetime_ms)
            })
            .collect()
    }

    /// Remove every live and pending orb, returning the removed live ids.
    pub fn clear_orbs(&mut self) -> Vec<u32> {
        self.pending_orbs.clear();
        self.orb_pos.clear();
        self.orb_grid.clear();
        self.orbs.drain(..).map(|orb| orb.id).collect()
    }

    /// Fill the reward slot, replacing any unclaimed reward.
    pub fn spawn_reward(&mut self, kind: &str, quantity: u32, enabled_at: u64, expires_at: u64) -> Reward {
        let position = if self.reward_spawn_points.is_empty() {
            self.random_free_position()
        } else {
            let idx = self.rng.random_range(0..self.reward_spawn_points.len());
            self.border.clamp(self.reward_spawn_points[idx]).0
        };
        let reward = Reward {
            id: self.next_id(),
            kind: kind.to_string(),
            quantity,
            position,
            enabled_at,
            expires_at,
            winner: None,
        };
        self.reward = Some(reward.clone());
        reward
    }

    /// Drop live orbs and the reward whose lifetime ran out.
    pub fn sweep_expired(&mut self, now: u64) -> Expired {
        let orbs: Vec<u32> = self.orbs.iter().filter(|o| o.is_expired(now)).map(|o| o.id).collect();
        for &id in &orbs {
            self.remove_orb(id);
        }
        let reward = if self.reward.as_ref().is_some_and(|r| r.is_expired(now)) {
            self.reward.take().map(|r| r.id)
        } else {
            None
        };
        Expired { orbs, reward }
    }
}

/// O(1) removal from a vec with a position index.
fn swap_remove_by_id<T>(
    items: &mut Vec<T>,
    pos: &mut HashMap<u32, usize>,
    id: u32,
    id_of: impl Fn(&T) -> u32,
) -> Option<T> {
    let idx = pos.remove(&id)?;
    let removed = items.swap_remove(idx);
    if idx < items.len() {
        pos.insert(id_of(&items[idx]), idx);
    }
    Some(removed)
}
