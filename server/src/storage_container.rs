use spacetimedb::{Identity, ReducerContext, Table};
use log;

// --- Constants ---
const LOOT_INTERACTION_DISTANCE_SQUARED: f32 = 96.0 * 96.0;
pub const MAX_CONTAINER_SLOTS: u16 = 96;

// Import table traits and shared types
use crate::eligibility::{ContainerFlags, EntityAccess};
use crate::entity_capabilities::EntityPose;
use crate::items::inventory_item as InventoryItemTableTrait;
use crate::models::{DroppedLocationData, EntityKind, ItemLocation};
use crate::overlay::{self, DbOverlaySink};
use crate::permissions::{ensure_admin, is_admin};
use crate::placement::{ContainerShape, GENERIC_RESIZABLE_PANEL};
use crate::player as PlayerTableTrait;
use crate::sort_button;
use crate::Player;

/// Anything in the world a player can open: boxes, drop boxes, vending machines,
/// tool cupboards, mailboxes, vehicle storage.
#[spacetimedb::table(name = storage_entity, public)]
#[derive(Clone, Debug)]
pub struct StorageEntity {
    #[primary_key]
    #[auto_inc]
    pub id: u32,
    pub prefab_name: String,
    pub skin_id: u64, // 0 = default skin
    pub kind: EntityKind,
    pub panel_name: Option<String>,
    pub owner_panel: Option<String>, // Mailboxes show a different panel to their owner
    pub owner_id: Option<Identity>,
    pub pos_x: f32,
    pub pos_y: f32,
    pub facing_radians: f32,
    pub is_destroyed: bool,
}

/// A slot-indexed container belonging to an entity. Most entities have one.
#[spacetimedb::table(name = storage_container, public)]
#[derive(Clone, Debug)]
pub struct StorageContainer {
    #[primary_key]
    #[auto_inc]
    pub id: u32,
    #[index(btree)]
    pub entity_id: u32,
    pub capacity: u16,
    pub is_locked: bool,
    pub input_blocked: bool,
    pub is_player_inventory: bool,
}

/// What a player is currently looting. One row per looting player.
#[spacetimedb::table(name = player_loot, public)]
#[derive(Clone, Debug)]
pub struct PlayerLoot {
    #[primary_key]
    pub player_identity: Identity,
    pub entity_id: u32,
    pub container_ids: Vec<u32>,
}

// --- Views used by placement and eligibility ---

pub fn loot_panel_name(entity: &StorageEntity) -> String {
    let owner_panel = match entity.kind {
        EntityKind::Mailbox => entity.owner_panel.clone(),
        _ => None,
    };
    owner_panel
        .or_else(|| entity.panel_name.clone())
        .unwrap_or_else(|| GENERIC_RESIZABLE_PANEL.to_string())
}

pub fn container_shape(entity: &StorageEntity, container: &StorageContainer) -> ContainerShape {
    ContainerShape {
        capacity: i32::from(container.capacity),
        panel_name: loot_panel_name(entity),
        is_restricted_subregion: entity.kind == EntityKind::BuildingPrivilege,
    }
}

pub fn container_flags(container: &StorageContainer) -> ContainerFlags {
    ContainerFlags {
        is_locked: container.is_locked,
        input_blocked: container.input_blocked,
        is_player_inventory: container.is_player_inventory,
        capacity: container.capacity,
    }
}

pub fn entity_access(entity: &StorageEntity) -> EntityAccess {
    EntityAccess {
        kind: entity.kind,
        pose: EntityPose {
            pos_x: entity.pos_x,
            pos_y: entity.pos_y,
            facing_radians: entity.facing_radians,
        },
        owner: entity.owner_id,
    }
}

// --- Helper Functions (Validation) ---

/// Validates that the sender can reach a live entity. Does NOT check ownership.
pub(crate) fn validate_entity_interaction(
    ctx: &ReducerContext,
    entity_id: u32,
) -> Result<(Player, StorageEntity), String> {
    let player = ctx.db.player().identity().find(ctx.sender)
        .ok_or_else(|| "Player not found".to_string())?;
    if player.is_dead {
        return Err("Player is dead".to_string());
    }
    let entity = ctx.db.storage_entity().id().find(entity_id)
        .filter(|e| !e.is_destroyed)
        .ok_or_else(|| format!("Storage entity {} not found", entity_id))?;

    let dist_sq = crate::utils::get_distance_squared(player.position_x, player.position_y, entity.pos_x, entity.pos_y);
    if dist_sq > LOOT_INTERACTION_DISTANCE_SQUARED {
        return Err("Too far away".to_string());
    }
    Ok((player, entity))
}

/// Validates that the sender is looting the entity that owns `container_id`
/// and is still in reach of it.
pub(crate) fn validate_looted_container(
    ctx: &ReducerContext,
    container_id: u32,
) -> Result<(Player, StorageContainer), String> {
    let loot = ctx.db.player_loot().player_identity().find(ctx.sender)
        .ok_or_else(|| "You are not looting anything".to_string())?;
    if !loot.container_ids.contains(&container_id) {
        return Err(format!("Container {} is not open", container_id));
    }
    let (player, _entity) = validate_entity_interaction(ctx, loot.entity_id)?;
    let container = ctx.db.storage_container().id().find(container_id)
        .ok_or_else(|| format!("Container {} not found", container_id))?;
    Ok((player, container))
}

pub(crate) fn containers_of(ctx: &ReducerContext, entity_id: u32) -> Vec<StorageContainer> {
    let mut containers: Vec<StorageContainer> = ctx.db.storage_container().entity_id().filter(entity_id).collect();
    containers.sort_by_key(|c| c.id);
    containers
}

/// Clears a player's loot state and hides their sort button.
pub(crate) fn stop_looting(ctx: &ReducerContext, player_identity: Identity) {
    if ctx.db.player_loot().player_identity().delete(player_identity) {
        log::debug!("[Loot] {:?} stopped looting.", player_identity);
    }
    overlay::hide_overlay(&mut DbOverlaySink { ctx }, player_identity);
}

fn ensure_owner_or_admin(ctx: &ReducerContext, entity: &StorageEntity) -> Result<(), String> {
    if entity.owner_id == Some(ctx.sender) || is_admin(ctx, ctx.sender) {
        Ok(())
    } else {
        Err("Only the owner can do that".to_string())
    }
}

fn validate_capacity(capacity: u16) -> Result<(), String> {
    if capacity == 0 || capacity > MAX_CONTAINER_SLOTS {
        return Err(format!("Capacity must be between 1 and {}", MAX_CONTAINER_SLOTS));
    }
    Ok(())
}

// --- Looting Reducers ---

/// Opens an entity's loot panel. The sort button decision runs on the next
/// scheduler pass, once the open containers are known.
#[spacetimedb::reducer]
pub fn loot_entity(ctx: &ReducerContext, entity_id: u32) -> Result<(), String> {
    let (player, entity) = validate_entity_interaction(ctx, entity_id)?;

    // A player only ever looks at one entity; opening another replaces it.
    stop_looting(ctx, player.identity);

    let container_ids: Vec<u32> = containers_of(ctx, entity_id).iter().map(|c| c.id).collect();
    if container_ids.is_empty() {
        return Err(format!("Storage entity {} has nothing to loot", entity_id));
    }

    log::info!("[Loot] {:?} opened entity {} ({} containers).", player.identity, entity_id, container_ids.len());
    ctx.db.player_loot().insert(PlayerLoot {
        player_identity: player.identity,
        entity_id,
        container_ids,
    });

    sort_button::handle_loot_entity(ctx, &player, &entity);
    Ok(())
}

#[spacetimedb::reducer]
pub fn end_looting(ctx: &ReducerContext) -> Result<(), String> {
    stop_looting(ctx, ctx.sender);
    Ok(())
}

// --- Entity Management Reducers ---

#[spacetimedb::reducer]
pub fn spawn_storage_entity(
    ctx: &ReducerContext,
    prefab_name: String,
    skin_id: u64,
    kind: EntityKind,
    panel_name: Option<String>,
    owner_panel: Option<String>,
    owner_id: Option<Identity>,
    pos_x: f32,
    pos_y: f32,
    facing_radians: f32,
    capacity: u16,
) -> Result<(), String> {
    ensure_admin(ctx)?;
    validate_capacity(capacity)?;
    if prefab_name.trim().is_empty() {
        return Err("Prefab name cannot be empty".to_string());
    }

    let entity = ctx.db.storage_entity().try_insert(StorageEntity {
        id: 0, // Auto-incremented
        prefab_name,
        skin_id,
        kind,
        panel_name,
        owner_panel,
        owner_id,
        pos_x,
        pos_y,
        facing_radians,
        is_destroyed: false,
    }).map_err(|e| format!("Failed to spawn entity: {}", e))?;

    ctx.db.storage_container().insert(StorageContainer {
        id: 0, // Auto-incremented
        entity_id: entity.id,
        capacity,
        is_locked: false,
        input_blocked: false,
        is_player_inventory: false,
    });
    log::info!("[Storage] Spawned {:?} entity {} ('{}') at ({:.1}, {:.1}) with {} slots.",
        entity.kind, entity.id, entity.prefab_name, pos_x, pos_y, capacity);
    Ok(())
}

/// Adds another container to an entity, e.g. a furnace's fuel slots.
#[spacetimedb::reducer]
pub fn add_storage_container(ctx: &ReducerContext, entity_id: u32, capacity: u16, is_player_inventory: bool) -> Result<(), String> {
    ensure_admin(ctx)?;
    validate_capacity(capacity)?;
    ctx.db.storage_entity().id().find(entity_id)
        .filter(|e| !e.is_destroyed)
        .ok_or_else(|| format!("Storage entity {} not found", entity_id))?;

    let container = ctx.db.storage_container().insert(StorageContainer {
        id: 0, // Auto-incremented
        entity_id,
        capacity,
        is_locked: false,
        input_blocked: false,
        is_player_inventory,
    });
    log::info!("[Storage] Added container {} ({} slots) to entity {}.", container.id, capacity, entity_id);
    Ok(())
}

/// Changes the slot count. Items already beyond the new capacity stay where
/// they are until the next sort hands them back to a player.
#[spacetimedb::reducer]
pub fn resize_storage_container(ctx: &ReducerContext, container_id: u32, capacity: u16) -> Result<(), String> {
    ensure_admin(ctx)?;
    validate_capacity(capacity)?;
    let containers = ctx.db.storage_container();
    let mut container = containers.id().find(container_id)
        .ok_or_else(|| format!("Container {} not found", container_id))?;
    log::info!("[Storage] Resizing container {}: {} -> {} slots.", container_id, container.capacity, capacity);
    container.capacity = capacity;
    containers.id().update(container);
    Ok(())
}

#[spacetimedb::reducer]
pub fn set_container_flags(ctx: &ReducerContext, container_id: u32, is_locked: bool, input_blocked: bool) -> Result<(), String> {
    let containers = ctx.db.storage_container();
    let mut container = containers.id().find(container_id)
        .ok_or_else(|| format!("Container {} not found", container_id))?;
    let entity = ctx.db.storage_entity().id().find(container.entity_id)
        .ok_or_else(|| format!("Storage entity {} not found", container.entity_id))?;
    ensure_owner_or_admin(ctx, &entity)?;

    container.is_locked = is_locked;
    container.input_blocked = input_blocked;
    containers.id().update(container);
    log::info!("[Storage] Container {} flags: locked={}, input_blocked={}.", container_id, is_locked, input_blocked);
    Ok(())
}

/// Destroys an entity. Its items are dropped where it stood, anyone looting
/// it is kicked out, and the row stays behind flagged as destroyed.
#[spacetimedb::reducer]
pub fn destroy_storage_entity(ctx: &ReducerContext, entity_id: u32) -> Result<(), String> {
    let entities = ctx.db.storage_entity();
    let mut entity = entities.id().find(entity_id)
        .filter(|e| !e.is_destroyed)
        .ok_or_else(|| format!("Storage entity {} not found", entity_id))?;
    ensure_owner_or_admin(ctx, &entity)?;

    let inventory = ctx.db.inventory_item();
    for container in containers_of(ctx, entity_id) {
        let items: Vec<_> = inventory.iter()
            .filter(|i| i.location.container_slot(container.id).is_some())
            .collect();
        for mut item in items {
            item.location = ItemLocation::Dropped(DroppedLocationData { pos_x: entity.pos_x, pos_y: entity.pos_y });
            inventory.instance_id().update(item);
        }
        ctx.db.storage_container().id().delete(container.id);
    }

    let looters: Vec<Identity> = ctx.db.player_loot().iter()
        .filter(|loot| loot.entity_id == entity_id)
        .map(|loot| loot.player_identity)
        .collect();
    for looter in looters {
        stop_looting(ctx, looter);
    }

    entity.is_destroyed = true;
    entities.id().update(entity);
    log::info!("[Storage] Entity {} destroyed by {:?}.", entity_id, ctx.sender);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: EntityKind, panel: Option<&str>, owner_panel: Option<&str>) -> StorageEntity {
        StorageEntity {
            id: 1,
            prefab_name: "box.prefab".to_string(),
            skin_id: 0,
            kind,
            panel_name: panel.map(str::to_string),
            owner_panel: owner_panel.map(str::to_string),
            owner_id: None,
            pos_x: 0.0,
            pos_y: 0.0,
            facing_radians: 0.0,
            is_destroyed: false,
        }
    }

    fn container(capacity: u16) -> StorageContainer {
        StorageContainer {
            id: 3,
            entity_id: 1,
            capacity,
            is_locked: false,
            input_blocked: false,
            is_player_inventory: false,
        }
    }

    #[test]
    fn panel_name_resolution() {
        assert_eq!(loot_panel_name(&entity(EntityKind::Generic, Some("furnace"), None)), "furnace");
        assert_eq!(loot_panel_name(&entity(EntityKind::Generic, None, None)), GENERIC_RESIZABLE_PANEL);
        assert_eq!(loot_panel_name(&entity(EntityKind::Mailbox, Some("mailboxentry"), Some("mailboxcontents"))), "mailboxcontents");
        assert_eq!(loot_panel_name(&entity(EntityKind::Mailbox, Some("mailboxentry"), None)), "mailboxentry");
        // Only mailboxes use the owner panel.
        assert_eq!(loot_panel_name(&entity(EntityKind::Generic, Some("generic"), Some("other"))), "generic");
    }

    #[test]
    fn tool_cupboard_is_a_restricted_subregion() {
        let shape = container_shape(&entity(EntityKind::BuildingPrivilege, Some("toolcupboard"), None), &container(30));
        assert!(shape.is_restricted_subregion);
        assert_eq!(shape.capacity, 30);

        let shape = container_shape(&entity(EntityKind::Generic, None, None), &container(12));
        assert!(!shape.is_restricted_subregion);
        assert_eq!(shape.panel_name, GENERIC_RESIZABLE_PANEL);
    }

    #[test]
    fn flags_and_access_mirror_rows() {
        let mut c = container(12);
        c.is_locked = true;
        let flags = container_flags(&c);
        assert!(flags.is_locked);
        assert_eq!(flags.capacity, 12);

        let e = entity(EntityKind::DropBox, None, None);
        let access = entity_access(&e);
        assert_eq!(access.kind, EntityKind::DropBox);
        assert_eq!(access.owner, None);
    }
}
