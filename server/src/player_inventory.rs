use spacetimedb::{Identity, ReducerContext, Table};
use log;
use std::collections::HashSet;

use crate::items::{inventory_item as InventoryItemTableTrait, item_definition as ItemDefinitionTableTrait};
use crate::items::InventoryItem;
use crate::models::{DroppedLocationData, InventoryLocationData, ItemLocation};
use crate::Player;
use crate::player as PlayerTableTrait;

pub(crate) const NUM_PLAYER_INVENTORY_SLOTS: u16 = 30;

// --- Helper Functions ---

// Finds the first free slot (0-29) in a player's personal inventory
pub(crate) fn find_first_empty_inventory_slot(ctx: &ReducerContext, player_id: Identity) -> Option<u16> {
    let occupied_slots: HashSet<u16> = ctx.db
        .inventory_item().iter()
        .filter_map(|i| i.location.inventory_slot(player_id))
        .collect();

    (0..NUM_PLAYER_INVENTORY_SLOTS).find(|slot| !occupied_slots.contains(slot))
}

/// Puts an existing item instance into the player's possession. Uses the first
/// free inventory slot; if the inventory is full the item is dropped at the
/// player's position. Never deletes the item.
pub(crate) fn give_item_to_player(ctx: &ReducerContext, player: &Player, instance_id: u64) {
    let inventory = ctx.db.inventory_item();
    let Some(mut item) = inventory.instance_id().find(instance_id) else {
        log::error!("[GiveItem] Item {} not found, cannot give it to {:?}.", instance_id, player.identity);
        return;
    };

    item.location = match find_first_empty_inventory_slot(ctx, player.identity) {
        Some(slot_index) => {
            log::info!("[GiveItem] Item {} -> inventory slot {} of {:?}.", instance_id, slot_index, player.identity);
            ItemLocation::Inventory(InventoryLocationData { owner_id: player.identity, slot_index })
        }
        None => {
            log::warn!("[GiveItem] Inventory of {:?} is full. Dropping item {} at ({:.1}, {:.1}).",
                player.identity, instance_id, player.position_x, player.position_y);
            ItemLocation::Dropped(DroppedLocationData { pos_x: player.position_x, pos_y: player.position_y })
        }
    };
    inventory.instance_id().update(item);
}

/// Creates a brand new stack of `item_name` and gives it to the player.
pub(crate) fn grant_new_item(ctx: &ReducerContext, player: &Player, item_name: &str, quantity: u32) -> Result<u64, String> {
    let item_def = ctx.db.item_definition().name().find(&item_name.to_string())
        .ok_or_else(|| format!("Item definition '{}' not found", item_name))?;
    if quantity == 0 || (!item_def.is_stackable && quantity != 1) || quantity > item_def.stack_size {
        return Err(format!("Invalid quantity {} for '{}'", quantity, item_name));
    }

    let inserted = ctx.db.inventory_item().try_insert(InventoryItem {
        instance_id: 0, // Auto-incremented
        item_def_id: item_def.id,
        quantity,
        location: ItemLocation::Dropped(DroppedLocationData { pos_x: player.position_x, pos_y: player.position_y }),
    }).map_err(|e| format!("Failed to create item: {}", e))?;

    give_item_to_player(ctx, player, inserted.instance_id);
    Ok(inserted.instance_id)
}

/// Picks up a dropped item lying within reach.
#[spacetimedb::reducer]
pub fn pick_up_dropped_item(ctx: &ReducerContext, item_instance_id: u64) -> Result<(), String> {
    const PICKUP_DISTANCE_SQUARED: f32 = 64.0 * 64.0;

    let player = ctx.db.player().identity().find(ctx.sender)
        .ok_or_else(|| "Player not found".to_string())?;
    let item = ctx.db.inventory_item().instance_id().find(item_instance_id)
        .ok_or_else(|| format!("Item instance {} not found", item_instance_id))?;
    let ItemLocation::Dropped(drop) = item.location else {
        return Err("Item is not on the ground".to_string());
    };
    let dist_sq = crate::utils::get_distance_squared(player.position_x, player.position_y, drop.pos_x, drop.pos_y);
    if dist_sq > PICKUP_DISTANCE_SQUARED {
        return Err("Too far away".to_string());
    }
    if find_first_empty_inventory_slot(ctx, player.identity).is_none() {
        return Err("Inventory is full".to_string());
    }
    give_item_to_player(ctx, &player, item_instance_id);
    Ok(())
}
