// server/src/entity_capabilities.rs
//
// Per entity-kind extra requirements. Drop boxes and vending machines only
// expose their storage from behind; every other kind has no extra check.

use crate::models::EntityKind;
use crate::utils::is_point_behind;

/// Where an entity stands and which way it faces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityPose {
    pub pos_x: f32,
    pub pos_y: f32,
    pub facing_radians: f32,
}

/// Returns true when a player at (px, py) may use the entity.
pub type BehindCheck = fn(pose: &EntityPose, px: f32, py: f32) -> bool;

fn player_is_behind(pose: &EntityPose, px: f32, py: f32) -> bool {
    is_point_behind(pose.pos_x, pose.pos_y, pose.facing_radians, px, py)
}

const BEHIND_CHECKS: [(EntityKind, BehindCheck); 2] = [
    (EntityKind::DropBox, player_is_behind),
    (EntityKind::VendingMachine, player_is_behind),
];

pub fn behind_check_for(kind: EntityKind) -> Option<BehindCheck> {
    BEHIND_CHECKS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, check)| *check)
}

/// Kinds without a registered check are always eligible.
pub fn passes_behind_check(kind: EntityKind, pose: &EntityPose, px: f32, py: f32) -> bool {
    behind_check_for(kind).map_or(true, |check| check(pose, px, py))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Facing 0 points along +Y.
    const POSE: EntityPose = EntityPose { pos_x: 100.0, pos_y: 100.0, facing_radians: 0.0 };

    #[test]
    fn drop_box_requires_player_behind() {
        assert!(passes_behind_check(EntityKind::DropBox, &POSE, 100.0, 60.0));
        assert!(!passes_behind_check(EntityKind::DropBox, &POSE, 100.0, 140.0));
    }

    #[test]
    fn vending_machine_requires_player_behind() {
        assert!(passes_behind_check(EntityKind::VendingMachine, &POSE, 100.0, 50.0));
        assert!(!passes_behind_check(EntityKind::VendingMachine, &POSE, 100.0, 150.0));
    }

    #[test]
    fn other_kinds_default_to_eligible() {
        for kind in [EntityKind::Generic, EntityKind::BuildingPrivilege, EntityKind::Mailbox] {
            assert!(behind_check_for(kind).is_none());
            assert!(passes_behind_check(kind, &POSE, 100.0, 150.0));
        }
    }
}
