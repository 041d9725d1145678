//! Contact detection and collider policy.
//!
//! This module handles:
//! - Client/client and client/pickup touch checks
//! - Capped movement steps
//! - Mapping hit collider kinds to a movement outcome

use glam::Vec2;

use crate::entity::ColliderKind;

/// Result of checking contact between two circles.
#[derive(Debug)]
pub struct ContactResult {
    /// Combined radius
    pub r: f32,
    /// Actual distance
    pub d: f32,
}

impl ContactResult {
    /// Touching includes exactly-tangent circles.
    pub fn is_touching(&self) -> bool {
        self.r >= self.d
    }
}

#[inline]
pub fn check_contact(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> ContactResult {
    ContactResult {
        r: a_radius + b_radius,
        d: a_pos.distance(b_pos),
    }
}

/// Move from `from` toward `to` by at most `max_step`, snapping when close enough.
#[inline]
pub fn step_toward(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    let dist = delta.length();
    if dist <= max_step || dist == 0.0 {
        to
    } else {
        from + delta / dist * max_step.max(0.0)
    }
}

/// What a movement candidate runs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Clear,
    /// Freeze at the resolved point.
    Stuck,
    /// Revert to the pre-move position.
    Collided,
}

/// Outcome for a set of hit colliders. `Stuck` wins over `Collided`.
pub fn resolve_contact(kinds: &[ColliderKind], sticky_islands: bool, level2_open: bool) -> Contact {
    let mut contact = Contact::Clear;
    for kind in kinds {
        let hit = match kind {
            ColliderKind::Land | ColliderKind::Collider => Contact::Stuck,
            ColliderKind::Island if sticky_islands => Contact::Stuck,
            ColliderKind::Island => Contact::Collided,
            ColliderKind::Level2Divider if level2_open => Contact::Clear,
            ColliderKind::Level2Divider => Contact::Stuck,
        };
        match hit {
            Contact::Stuck => return Contact::Stuck,
            Contact::Collided => contact = Contact::Collided,
            Contact::Clear => {}
        }
    }
    contact
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_check() {
        let result = check_contact(Vec2::new(0.0, 0.0), 0.5, Vec2::new(0.8, 0.0), 0.4);
        assert!(result.is_touching());
        assert!((result.d - 0.8).abs() < 1e-6);

        let result = check_contact(Vec2::new(0.0, 0.0), 0.5, Vec2::new(3.0, 0.0), 0.5);
        assert!(!result.is_touching());
    }

    #[test]
    fn test_step_toward() {
        let p = step_toward(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0);
        assert_eq!(p, Vec2::new(2.0, 0.0));
        // snaps once within one step
        let p = step_toward(Vec2::new(9.0, 0.0), Vec2::new(10.0, 0.0), 2.0);
        assert_eq!(p, Vec2::new(10.0, 0.0));
        assert_eq!(step_toward(Vec2::ONE, Vec2::ONE, 0.0), Vec2::ONE);
    }

    #[test]
    fn test_resolve_contact() {
        use ColliderKind::*;
        assert_eq!(resolve_contact(&[], false, false), Contact::Clear);
        assert_eq!(resolve_contact(&[Land], false, false), Contact::Stuck);
        assert_eq!(resolve_contact(&[Collider], false, true), Contact::Stuck);
        assert_eq!(resolve_contact(&[Island], false, false), Contact::Collided);
        assert_eq!(resolve_contact(&[Island], true, false), Contact::Stuck);
        assert_eq!(resolve_contact(&[Level2Divider], false, false), Contact::Stuck);
        assert_eq!(resolve_contact(&[Level2Divider], false, true), Contact::Clear);
        assert_eq!(resolve_contact(&[Island, Land], false, false), Contact::Stuck);
    }
}
