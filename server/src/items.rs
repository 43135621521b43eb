use spacetimedb::{ReducerContext, SpacetimeType, Table};
use log;

use crate::models::ItemLocation;

// --- Item Enums and Structs ---

// Fixed set of item categories. Declaration order is the host's order, NOT the sort order;
// see item_categories.rs for how the sort rank is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, SpacetimeType)]
pub enum ItemCategory {
    Weapon,
    Construction,
    Items,
    Resources,
    Attire,
    Tool,
    Medical,
    Food,
    Ammunition,
    Traps,
    Misc,
    Component,
    Electrical,
    Fun,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 14] = [
        ItemCategory::Weapon,
        ItemCategory::Construction,
        ItemCategory::Items,
        ItemCategory::Resources,
        ItemCategory::Attire,
        ItemCategory::Tool,
        ItemCategory::Medical,
        ItemCategory::Food,
        ItemCategory::Ammunition,
        ItemCategory::Traps,
        ItemCategory::Misc,
        ItemCategory::Component,
        ItemCategory::Electrical,
        ItemCategory::Fun,
    ];

    /// Canonical symbolic name, independent of any display locale.
    pub fn name(&self) -> &'static str {
        match self {
            ItemCategory::Weapon => "Weapon",
            ItemCategory::Construction => "Construction",
            ItemCategory::Items => "Items",
            ItemCategory::Resources => "Resources",
            ItemCategory::Attire => "Attire",
            ItemCategory::Tool => "Tool",
            ItemCategory::Medical => "Medical",
            ItemCategory::Food => "Food",
            ItemCategory::Ammunition => "Ammunition",
            ItemCategory::Traps => "Traps",
            ItemCategory::Misc => "Misc",
            ItemCategory::Component => "Component",
            ItemCategory::Electrical => "Electrical",
            ItemCategory::Fun => "Fun",
        }
    }

    /// Dense index of the variant in declaration order.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[spacetimedb::table(name = item_definition, public)]
#[derive(Clone, Debug)]
pub struct ItemDefinition {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[unique]
    pub name: String,          // Canonical name, also what sorting compares
    pub description: String,
    pub category: ItemCategory,
    pub icon_asset_name: String,
    pub is_stackable: bool,
    pub stack_size: u32,
}

// --- Inventory Table ---

// Represents an instance of an item, wherever it currently is
#[spacetimedb::table(name = inventory_item, public)]
#[derive(Clone, Debug)]
pub struct InventoryItem {
    #[primary_key]
    #[auto_inc]
    pub instance_id: u64,
    pub item_def_id: u64,
    pub quantity: u32,
    pub location: ItemLocation,
}

// --- Item Reducers ---

// Seeds the item definitions if the table is empty
pub fn seed_items(ctx: &ReducerContext) -> Result<(), String> {
    let items = ctx.db.item_definition();
    if items.iter().count() > 0 {
        log::info!("Item definitions already seeded ({}). Skipping.", items.iter().count());
        return Ok(());
    }

    log::info!("Seeding initial item definitions...");

    let initial_items = [
        ("Wood", "A sturdy piece of wood.", ItemCategory::Resources, "wood.png", true, 1000),
        ("Stones", "A chunk of rock.", ItemCategory::Resources, "stones.png", true, 1000),
        ("Metal Fragments", "Smelted metal.", ItemCategory::Resources, "metal_fragments.png", true, 1000),
        ("Rock", "The humble rock.", ItemCategory::Tool, "rock.png", false, 1),
        ("Stone Hatchet", "A simple hatchet for chopping wood.", ItemCategory::Tool, "stone_hatchet.png", false, 1),
        ("Stone Pickaxe", "A simple pickaxe for breaking rocks.", ItemCategory::Tool, "stone_pickaxe.png", false, 1),
        ("Wooden Spear", "Pointy stick.", ItemCategory::Weapon, "wooden_spear.png", false, 1),
        ("Wooden Arrow", "Ammunition for bows.", ItemCategory::Ammunition, "wooden_arrow.png", true, 64),
        ("Bandage", "Stops bleeding.", ItemCategory::Medical, "bandage.png", true, 3),
        ("Mushroom", "Edible, probably.", ItemCategory::Food, "mushroom.png", true, 10),
        ("Cloth Shirt", "Keeps you warm.", ItemCategory::Attire, "cloth_shirt.png", false, 1),
        ("Camp Fire", "Provides warmth and light.", ItemCategory::Construction, "campfire.png", false, 1),
        ("Rope", "Useful for crafting.", ItemCategory::Component, "rope.png", true, 50),
        ("Note", "A blank note.", ItemCategory::Misc, "note.png", false, 1),
    ];

    let mut seeded_count = 0;
    for (name, description, category, icon, is_stackable, stack_size) in initial_items {
        let item_def = ItemDefinition {
            id: 0, // Auto-incremented
            name: name.to_string(),
            description: description.to_string(),
            category,
            icon_asset_name: icon.to_string(),
            is_stackable,
            stack_size,
        };
        match items.try_insert(item_def) {
            Ok(_) => seeded_count += 1,
            Err(e) => log::error!("Failed to insert item definition during seeding: {}", e),
        }
    }

    log::info!("Finished seeding {} item definitions.", seeded_count);
    Ok(())
}

/// Works out how much of `source` can be stacked onto `target`.
/// Returns (quantity transferred, new source quantity, new target quantity, delete source).
pub(crate) fn calculate_merge_result(
    source: &InventoryItem,
    target: &InventoryItem,
    item_def: &ItemDefinition,
) -> Result<(u32, u32, u32, bool), String> {
    if source.instance_id == target.instance_id {
        return Err("Cannot merge an item onto itself".to_string());
    }
    if !item_def.is_stackable || source.item_def_id != target.item_def_id {
        return Err("Items cannot be stacked".to_string());
    }
    let space_available = item_def.stack_size.saturating_sub(target.quantity);
    if space_available == 0 {
        return Err("Target stack is full".to_string());
    }
    let qty_transfer = source.quantity.min(space_available);
    let source_new_qty = source.quantity - qty_transfer;
    let target_new_qty = target.quantity + qty_transfer;
    Ok((qty_transfer, source_new_qty, target_new_qty, source_new_qty == 0))
}
