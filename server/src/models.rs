// server/src/models.rs
//
// Shared value types used as columns by several tables.

use spacetimedb::{Identity, SpacetimeType};

/// Slot inside a player's personal inventory.
#[derive(SpacetimeType, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InventoryLocationData {
    pub owner_id: Identity,
    pub slot_index: u16,
}

/// Slot inside a storage container.
#[derive(SpacetimeType, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerLocationData {
    pub container_id: u32,
    pub slot_index: u16,
}

/// Item lying on the ground, usually because a player's inventory was full.
#[derive(SpacetimeType, Clone, Copy, Debug, PartialEq)]
pub struct DroppedLocationData {
    pub pos_x: f32,
    pub pos_y: f32,
}

/// Where an item instance currently lives.
#[derive(SpacetimeType, Clone, Copy, Debug, PartialEq)]
pub enum ItemLocation {
    Inventory(InventoryLocationData),
    Container(ContainerLocationData),
    Dropped(DroppedLocationData),
}

impl ItemLocation {
    pub fn container_slot(&self, container_id: u32) -> Option<u16> {
        match self {
            ItemLocation::Container(data) if data.container_id == container_id => Some(data.slot_index),
            _ => None,
        }
    }

    pub fn inventory_slot(&self, player_id: Identity) -> Option<u16> {
        match self {
            ItemLocation::Inventory(data) if data.owner_id == player_id => Some(data.slot_index),
            _ => None,
        }
    }
}

/// Host-side classification of a storage entity. Drives the behind-check
/// capability lookup and the restricted-subregion rule.
#[derive(SpacetimeType, Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityKind {
    Generic,
    DropBox,
    VendingMachine,
    BuildingPrivilege,
    Mailbox,
}
