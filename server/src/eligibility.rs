// server/src/eligibility.rs
//
// Checks a player must pass before the sort button is shown or a sort runs.
// Every failure is a quiet "not available here"; callers log it at debug and
// carry on.

use std::fmt;

use spacetimedb::Identity;

use crate::ally::AllyResolver;
use crate::config::ContainerTypeConfig;
use crate::entity_capabilities::{passes_behind_check, EntityPose};
use crate::models::EntityKind;
use crate::preferences::PreferenceView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ineligible {
    NoPermission,
    NotSingleContainer,
    UnsupportedContainerType,
    ContainerTypeDisabled,
    NotBehind,
    NotAllied,
    Locked,
    InputBlocked,
    PlayerInventory,
    TooFewSlots,
    SortingDisabled,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Ineligible::NoPermission => "player lacks the sort permission",
            Ineligible::NotSingleContainer => "not exactly one container in view",
            Ineligible::UnsupportedContainerType => "container type is not registered",
            Ineligible::ContainerTypeDisabled => "container type is disabled",
            Ineligible::NotBehind => "player is not behind the entity",
            Ineligible::NotAllied => "player is not allied with the owner",
            Ineligible::Locked => "container is locked",
            Ineligible::InputBlocked => "container input is blocked",
            Ineligible::PlayerInventory => "container is a player inventory",
            Ineligible::TooFewSlots => "container has fewer than two slots",
            Ineligible::SortingDisabled => "player disabled sorting",
        };
        f.write_str(reason)
    }
}

/// Container state that matters for sorting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerFlags {
    pub is_locked: bool,
    pub input_blocked: bool,
    pub is_player_inventory: bool,
    pub capacity: u16,
}

/// The entity side of an interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityAccess {
    pub kind: EntityKind,
    pub pose: EntityPose,
    pub owner: Option<Identity>,
}

pub fn check_single_container(container_count: usize) -> Result<(), Ineligible> {
    if container_count == 1 {
        Ok(())
    } else {
        Err(Ineligible::NotSingleContainer)
    }
}

/// Returns the configured X offset for an enabled container type.
pub fn check_container_type(config: Option<&ContainerTypeConfig>) -> Result<f32, Ineligible> {
    match config {
        None => Err(Ineligible::UnsupportedContainerType),
        Some(config) if !config.enabled => Err(Ineligible::ContainerTypeDisabled),
        Some(config) => Ok(config.offset_x),
    }
}

pub fn check_preference(view: &PreferenceView) -> Result<(), Ineligible> {
    if view.sorting_enabled {
        Ok(())
    } else {
        Err(Ineligible::SortingDisabled)
    }
}

/// Owned entities are only open to the owner and their allies, when ownership
/// checks are on. Unowned entities are open to everyone.
pub(crate) fn check_owner_access<A: AllyResolver + ?Sized>(
    check_ownership: bool,
    owner: Option<Identity>,
    player: Identity,
    allies: &A,
) -> Result<(), Ineligible> {
    match owner {
        Some(owner) if check_ownership && owner != player && !allies.is_ally(player, owner) => {
            Err(Ineligible::NotAllied)
        }
        _ => Ok(()),
    }
}

pub fn check_container_sortable(flags: &ContainerFlags) -> Result<(), Ineligible> {
    if flags.is_locked {
        return Err(Ineligible::Locked);
    }
    if flags.input_blocked {
        return Err(Ineligible::InputBlocked);
    }
    if flags.is_player_inventory {
        return Err(Ineligible::PlayerInventory);
    }
    if flags.capacity <= 1 {
        return Err(Ineligible::TooFewSlots);
    }
    Ok(())
}

/// Behind-check for the entity kind, then owner and ally rules.
pub(crate) fn check_entity_access<A: AllyResolver + ?Sized>(
    access: &EntityAccess,
    player: Identity,
    player_pos: (f32, f32),
    check_ownership: bool,
    allies: &A,
) -> Result<(), Ineligible> {
    if !passes_behind_check(access.kind, &access.pose, player_pos.0, player_pos.1) {
        return Err(Ineligible::NotBehind);
    }
    check_owner_access(check_ownership, access.owner, player, allies)
}

/// Everything checked per entity before the button is shown or a sort runs.
/// Returns the configured X offset.
pub(crate) fn check_entity_gate<A: AllyResolver + ?Sized>(
    container_type: Option<&ContainerTypeConfig>,
    access: &EntityAccess,
    player: Identity,
    player_pos: (f32, f32),
    check_ownership: bool,
    preference: &PreferenceView,
    allies: &A,
) -> Result<f32, Ineligible> {
    let offset_x = check_container_type(container_type)?;
    check_preference(preference)?;
    check_entity_access(access, player, player_pos, check_ownership, allies)?;
    Ok(offset_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAllies(bool);

    impl AllyResolver for FixedAllies {
        fn is_ally(&self, _player: Identity, _target: Identity) -> bool {
            self.0
        }
    }

    fn id(n: u8) -> Identity {
        Identity::from_byte_array([n; 32])
    }

    fn flags() -> ContainerFlags {
        ContainerFlags { is_locked: false, input_blocked: false, is_player_inventory: false, capacity: 12 }
    }

    fn access(kind: EntityKind, owner: Option<Identity>) -> EntityAccess {
        EntityAccess {
            kind,
            pose: EntityPose { pos_x: 0.0, pos_y: 0.0, facing_radians: 0.0 },
            owner,
        }
    }

    #[test]
    fn exactly_one_container() {
        assert_eq!(check_single_container(1), Ok(()));
        assert_eq!(check_single_container(0), Err(Ineligible::NotSingleContainer));
        assert_eq!(check_single_container(2), Err(Ineligible::NotSingleContainer));
    }

    #[test]
    fn container_type_registry() {
        let mut config = ContainerTypeConfig {
            id: 1,
            prefab_name: Some("box".to_string()),
            skin_id: None,
            enabled: true,
            offset_x: 476.5,
        };
        assert_eq!(check_container_type(Some(&config)), Ok(476.5));
        config.enabled = false;
        assert_eq!(check_container_type(Some(&config)), Err(Ineligible::ContainerTypeDisabled));
        assert_eq!(check_container_type(None), Err(Ineligible::UnsupportedContainerType));
    }

    #[test]
    fn container_state() {
        assert_eq!(check_container_sortable(&flags()), Ok(()));
        assert_eq!(check_container_sortable(&ContainerFlags { is_locked: true, ..flags() }), Err(Ineligible::Locked));
        assert_eq!(check_container_sortable(&ContainerFlags { input_blocked: true, ..flags() }), Err(Ineligible::InputBlocked));
        assert_eq!(check_container_sortable(&ContainerFlags { is_player_inventory: true, ..flags() }), Err(Ineligible::PlayerInventory));
        assert_eq!(check_container_sortable(&ContainerFlags { capacity: 1, ..flags() }), Err(Ineligible::TooFewSlots));
        assert_eq!(check_container_sortable(&ContainerFlags { capacity: 2, ..flags() }), Ok(()));
    }

    #[test]
    fn ownership_rules() {
        let owner = id(9);
        let player = id(1);
        assert_eq!(check_owner_access(true, None, player, &FixedAllies(false)), Ok(()));
        assert_eq!(check_owner_access(true, Some(player), player, &FixedAllies(false)), Ok(()));
        assert_eq!(check_owner_access(true, Some(owner), player, &FixedAllies(false)), Err(Ineligible::NotAllied));
        assert_eq!(check_owner_access(true, Some(owner), player, &FixedAllies(true)), Ok(()));
        assert_eq!(check_owner_access(false, Some(owner), player, &FixedAllies(false)), Ok(()));
    }

    #[test]
    fn behind_check_runs_before_ownership() {
        let drop_box = access(EntityKind::DropBox, Some(id(9)));
        // In front of the drop box (facing +Y).
        assert_eq!(
            check_entity_access(&drop_box, id(1), (0.0, 20.0), true, &FixedAllies(false)),
            Err(Ineligible::NotBehind)
        );
        assert_eq!(
            check_entity_access(&drop_box, id(1), (0.0, -20.0), true, &FixedAllies(false)),
            Err(Ineligible::NotAllied)
        );
        assert_eq!(check_entity_access(&drop_box, id(1), (0.0, -20.0), true, &FixedAllies(true)), Ok(()));
    }

    #[test]
    fn generic_entities_skip_behind_check() {
        let chest = access(EntityKind::Generic, None);
        assert_eq!(check_entity_access(&chest, id(1), (0.0, 20.0), true, &FixedAllies(false)), Ok(()));
    }

    #[test]
    fn entity_gate_checks_type_preference_and_access() {
        let config = ContainerTypeConfig {
            id: 1,
            prefab_name: Some("dropbox".to_string()),
            skin_id: None,
            enabled: true,
            offset_x: 300.0,
        };
        let enabled = PreferenceView { sorting_enabled: true, sort_by_category: false };
        let disabled = PreferenceView { sorting_enabled: false, ..enabled };
        let drop_box = access(EntityKind::DropBox, None);
        let behind = (0.0, -20.0);

        assert_eq!(check_entity_gate(Some(&config), &drop_box, id(1), behind, true, &enabled, &FixedAllies(false)), Ok(300.0));
        assert_eq!(
            check_entity_gate(None, &drop_box, id(1), behind, true, &enabled, &FixedAllies(false)),
            Err(Ineligible::UnsupportedContainerType)
        );
        assert_eq!(
            check_entity_gate(Some(&config), &drop_box, id(1), behind, true, &disabled, &FixedAllies(false)),
            Err(Ineligible::SortingDisabled)
        );
        assert_eq!(
            check_entity_gate(Some(&config), &drop_box, id(1), (0.0, 20.0), true, &enabled, &FixedAllies(false)),
            Err(Ineligible::NotBehind)
        );
    }

    #[test]
    fn disabled_preference_blocks() {
        let view = PreferenceView { sorting_enabled: false, sort_by_category: true };
        assert_eq!(check_preference(&view), Err(Ineligible::SortingDisabled));
        assert_eq!(Ineligible::SortingDisabled.to_string(), "player disabled sorting");
    }
}
