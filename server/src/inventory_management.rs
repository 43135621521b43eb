use std::collections::HashMap;

use spacetimedb::{Identity, ReducerContext, Table};
use log;

// Import necessary types and Table Traits
use crate::items::{InventoryItem, calculate_merge_result};
use crate::items::{inventory_item as InventoryItemTableTrait, item_definition as ItemDefinitionTableTrait};
use crate::models::{ContainerLocationData, InventoryLocationData, ItemLocation};
use crate::player_inventory::{self, NUM_PLAYER_INVENTORY_SLOTS};
use crate::sort_engine::SortableItem;
use crate::storage_container::{self, StorageContainer};
use crate::Player;

// --- Generic Item Container Trait ---

/// Slot-indexed item storage, as seen by the sort engine.
pub(crate) trait ItemContainer {
    /// Total number of slots.
    fn capacity(&self) -> u16;

    /// Snapshot of the items currently in the container.
    fn items(&self) -> Vec<SortableItem>;

    /// Detaches an item from its slot, freeing the slot.
    fn remove_item(&mut self, instance_id: u64);

    /// Places a previously removed item into the lowest free slot.
    /// Returns None if no slot is free.
    fn insert_into_first_free_slot(&mut self, instance_id: u64) -> Option<u16>;
}

/// Whoever receives items that could not go back into a container.
pub(crate) trait ItemRecipient {
    fn give_item(&mut self, instance_id: u64);
}

// --- Database-backed implementations ---

/// A storage container row plus its slot occupancy, loaded once per reducer call.
pub(crate) struct DbContainer<'a> {
    ctx: &'a ReducerContext,
    container_id: u32,
    capacity: u16,
    occupied: HashMap<u16, u64>,
}

impl<'a> DbContainer<'a> {
    pub(crate) fn load(ctx: &'a ReducerContext, container: &StorageContainer) -> Self {
        let occupied = ctx.db.inventory_item().iter()
            .filter_map(|item| item.location.container_slot(container.id).map(|slot| (slot, item.instance_id)))
            .collect();
        Self {
            ctx,
            container_id: container.id,
            capacity: container.capacity,
            occupied,
        }
    }
}

impl ItemContainer for DbContainer<'_> {
    fn capacity(&self) -> u16 {
        self.capacity
    }

    fn items(&self) -> Vec<SortableItem> {
        let inventory = self.ctx.db.inventory_item();
        let item_defs = self.ctx.db.item_definition();

        let mut items = Vec::with_capacity(self.occupied.len());
        for (slot, instance_id) in &self.occupied {
            let Some(item) = inventory.instance_id().find(instance_id) else {
                continue;
            };
            match item_defs.id().find(item.item_def_id) {
                Some(def) => items.push(SortableItem {
                    instance_id: item.instance_id,
                    category: def.category,
                    display_name: def.name,
                    amount: item.quantity,
                    position: *slot,
                }),
                None => {
                    // Keep it out of the sort so it stays exactly where it is.
                    log::error!("[InvManager] Definition {} missing for item {} in container {}.",
                        item.item_def_id, item.instance_id, self.container_id);
                }
            }
        }
        items
    }

    fn remove_item(&mut self, instance_id: u64) {
        self.occupied.retain(|_, id| *id != instance_id);
    }

    fn insert_into_first_free_slot(&mut self, instance_id: u64) -> Option<u16> {
        let slot = (0..self.capacity()).find(|slot| !self.occupied.contains_key(slot))?;
        let inventory = self.ctx.db.inventory_item();
        let mut item = inventory.instance_id().find(instance_id)?;
        item.location = ItemLocation::Container(ContainerLocationData {
            container_id: self.container_id,
            slot_index: slot,
        });
        inventory.instance_id().update(item);
        self.occupied.insert(slot, instance_id);
        Some(slot)
    }
}

/// Hands items to a player's personal inventory (or drops them at their feet).
pub(crate) struct DbRecipient<'a> {
    pub ctx: &'a ReducerContext,
    pub player: &'a Player,
}

impl ItemRecipient for DbRecipient<'_> {
    fn give_item(&mut self, instance_id: u64) {
        player_inventory::give_item_to_player(self.ctx, self.player, instance_id);
    }
}

// --- Helper: slot lookups ---

fn find_item_in_container_slot(ctx: &ReducerContext, container_id: u32, slot: u16) -> Option<InventoryItem> {
    ctx.db.inventory_item().iter()
        .find(|i| i.location.container_slot(container_id) == Some(slot))
}

fn find_item_in_inventory_slot(ctx: &ReducerContext, player_id: Identity, slot: u16) -> Option<InventoryItem> {
    ctx.db.inventory_item().iter()
        .find(|i| i.location.inventory_slot(player_id) == Some(slot))
}

// --- Reducers ---

/// Moves an item from the caller's inventory INTO a slot of a container they are looting.
/// Occupied targets are merged when possible, swapped otherwise.
#[spacetimedb::reducer]
pub fn move_item_to_container(
    ctx: &ReducerContext,
    item_instance_id: u64,
    container_id: u32,
    target_slot_index: u16,
) -> Result<(), String> {
    let sender_id = ctx.sender;
    let inventory = ctx.db.inventory_item();
    let item_defs = ctx.db.item_definition();

    let (_player, container) = storage_container::validate_looted_container(ctx, container_id)?;
    if container.is_locked || container.input_blocked {
        return Err("Container does not accept items right now".to_string());
    }
    if target_slot_index >= container.capacity {
        return Err(format!("Target slot index {} out of bounds.", target_slot_index));
    }

    let mut item_to_move = inventory.instance_id().find(item_instance_id)
        .ok_or_else(|| format!("Item instance {} not found", item_instance_id))?;
    let source_slot = item_to_move.location.inventory_slot(sender_id)
        .ok_or_else(|| "Item is not in your inventory".to_string())?;
    let item_def = item_defs.id().find(item_to_move.item_def_id)
        .ok_or_else(|| format!("Definition missing for item {}", item_to_move.item_def_id))?;

    let target_location = ItemLocation::Container(ContainerLocationData { container_id, slot_index: target_slot_index });

    if let Some(mut target_item) = find_item_in_container_slot(ctx, container_id, target_slot_index) {
        match calculate_merge_result(&item_to_move, &target_item, &item_def) {
            Ok((qty_transfer, source_new_qty, target_new_qty, delete_source)) => {
                log::info!("[InvManager MergeToContainer] Merging {} of item {} onto item {}.",
                    qty_transfer, item_instance_id, target_item.instance_id);
                target_item.quantity = target_new_qty;
                inventory.instance_id().update(target_item);
                if delete_source {
                    inventory.instance_id().delete(item_instance_id);
                } else {
                    item_to_move.quantity = source_new_qty;
                    inventory.instance_id().update(item_to_move);
                }
            }
            Err(_) => {
                log::info!("[InvManager SwapToContainer] Swapping item {} with container {} slot {}.",
                    item_instance_id, container_id, target_slot_index);
                target_item.location = ItemLocation::Inventory(InventoryLocationData { owner_id: sender_id, slot_index: source_slot });
                inventory.instance_id().update(target_item);
                item_to_move.location = target_location;
                inventory.instance_id().update(item_to_move);
            }
        }
    } else {
        log::info!("[InvManager PlaceInContainer] Moving item {} to container {} slot {}.",
            item_instance_id, container_id, target_slot_index);
        item_to_move.location = target_location;
        inventory.instance_id().update(item_to_move);
    }
    Ok(())
}

/// Moves an item FROM a container the caller is looting INTO a slot of their inventory.
#[spacetimedb::reducer]
pub fn move_item_from_container(
    ctx: &ReducerContext,
    item_instance_id: u64,
    target_inventory_slot: u16,
) -> Result<(), String> {
    let sender_id = ctx.sender;
    let inventory = ctx.db.inventory_item();

    let mut item_to_move = inventory.instance_id().find(item_instance_id)
        .ok_or_else(|| format!("Item instance {} not found", item_instance_id))?;
    let ItemLocation::Container(source) = item_to_move.location else {
        return Err("Item is not in a container".to_string());
    };
    let (_player, container) = storage_container::validate_looted_container(ctx, source.container_id)?;
    if container.is_locked {
        return Err("Container is locked".to_string());
    }
    if target_inventory_slot >= NUM_PLAYER_INVENTORY_SLOTS {
        return Err("Invalid inventory target index".to_string());
    }

    if let Some(mut target_item) = find_item_in_inventory_slot(ctx, sender_id, target_inventory_slot) {
        log::info!("[InvManager FromContainer] Swapping item {} with inventory slot {}.",
            item_instance_id, target_inventory_slot);
        target_item.location = ItemLocation::Container(source);
        inventory.instance_id().update(target_item);
    }

    item_to_move.location = ItemLocation::Inventory(InventoryLocationData { owner_id: sender_id, slot_index: target_inventory_slot });
    inventory.instance_id().update(item_to_move);
    log::debug!("[InvManager FromContainer] Item {} moved from container {} slot {} to player {:?}.",
        item_instance_id, source.container_id, source.slot_index, sender_id);
    Ok(())
}
