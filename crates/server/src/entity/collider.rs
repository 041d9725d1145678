//! Static map colliders.

use glam::Vec2;

/// Collision policy, selected by the collider's name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderKind {
    /// Always freezes movement.
    Land,
    /// Freezes with sticky islands, otherwise blocks.
    Island,
    /// Always freezes movement.
    Collider,
    /// Freezes unless the level-2 wall is open.
    Level2Divider,
}

impl ColliderKind {
    pub fn from_name(name: &str) -> Option<Self> {
        if name.starts_with("Level2Divider") {
            Some(ColliderKind::Level2Divider)
        } else if name.starts_with("Land") {
            Some(ColliderKind::Land)
        } else if name.starts_with("Island") {
            Some(ColliderKind::Island)
        } else if name.starts_with("Collider") {
            Some(ColliderKind::Collider)
        } else {
            None
        }
    }
}

/// An axis-aligned box.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCollider {
    pub id: u32,
    pub name: String,
    pub kind: ColliderKind,
    pub min: Vec2,
    pub max: Vec2,
}

impl StaticCollider {
    /// Returns `None` for names without a known prefix.
    pub fn new(id: u32, name: &str, a: Vec2, b: Vec2) -> Option<Self> {
        let kind = ColliderKind::from_name(name)?;
        Some(Self {
            id,
            name: name.to_string(),
            kind,
            min: a.min(b),
            max: a.max(b),
        })
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ColliderKind::from_name("Land_north"), Some(ColliderKind::Land));
        assert_eq!(ColliderKind::from_name("Island3"), Some(ColliderKind::Island));
        assert_eq!(ColliderKind::from_name("ColliderRock"), Some(ColliderKind::Collider));
        assert_eq!(ColliderKind::from_name("Level2Divider"), Some(ColliderKind::Level2Divider));
        assert_eq!(ColliderKind::from_name("Tree"), None);
    }

    #[test]
    fn test_contains_normalizes_corners() {
        let c = StaticCollider::new(1, "Land", Vec2::new(5.0, 5.0), Vec2::new(-5.0, -5.0)).unwrap();
        assert!(c.contains(Vec2::ZERO));
        assert!(c.contains(Vec2::new(5.0, -5.0)));
        assert!(!c.contains(Vec2::new(5.1, 0.0)));
    }
}
