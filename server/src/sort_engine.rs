// server/src/sort_engine.rs
//
// Deterministic in-place reordering of a container's items.
//
// Ordering (ascending): category rank (only when sorting by category), then
// canonical name by codepoint, then amount. Equal items may land in either
// relative order.

use std::cmp::Ordering;

use crate::inventory_management::{ItemContainer, ItemRecipient};
use crate::item_categories::CategoryOrderTable;
use crate::items::ItemCategory;

/// Only slots below this index take part in sorting when the container
/// belongs to a building-privilege entity.
pub const RESTRICTED_SUBREGION_SLOTS: u16 = 24;

/// Read-only snapshot of one item as the sort engine sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortableItem {
    pub instance_id: u64,
    pub category: ItemCategory,
    pub display_name: String,
    pub amount: u32,
    pub position: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortOutcome {
    /// (instance id, new slot) in the order the items were re-inserted.
    pub placed: Vec<(u64, u16)>,
    /// Items that no longer fit and were handed to the acting player.
    pub returned_to_player: Vec<u64>,
}

pub fn compare_items(
    a: &SortableItem,
    b: &SortableItem,
    by_category: bool,
    categories: &CategoryOrderTable,
) -> Ordering {
    if by_category {
        let category_cmp = categories.rank(a.category).cmp(&categories.rank(b.category));
        if category_cmp != Ordering::Equal {
            return category_cmp;
        }
    }

    // str::cmp is a byte-wise comparison of UTF-8, i.e. codepoint order.
    a.display_name
        .cmp(&b.display_name)
        .then_with(|| a.amount.cmp(&b.amount))
}

pub fn sort_items(items: &mut [SortableItem], by_category: bool, categories: &CategoryOrderTable) {
    items.sort_unstable_by(|a, b| compare_items(a, b, by_category, categories));
}

/// Filters a container snapshot down to the items that take part in a sort.
pub fn participating_items(items: Vec<SortableItem>, restricted_subregion: bool) -> Vec<SortableItem> {
    if !restricted_subregion {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.position < RESTRICTED_SUBREGION_SLOTS)
        .collect()
}

/// Removes every participating item, then re-inserts them one at a time in
/// sorted order into the first free slot. Anything that cannot be re-inserted
/// goes to `recipient`; no item is ever dropped.
pub(crate) fn sort_container<C, R>(
    container: &mut C,
    recipient: &mut R,
    by_category: bool,
    restricted_subregion: bool,
    categories: &CategoryOrderTable,
) -> SortOutcome
where
    C: ItemContainer + ?Sized,
    R: ItemRecipient + ?Sized,
{
    let mut participants = participating_items(container.items(), restricted_subregion);

    for item in &participants {
        container.remove_item(item.instance_id);
    }

    sort_items(&mut participants, by_category, categories);

    let mut outcome = SortOutcome::default();
    for item in participants {
        match container.insert_into_first_free_slot(item.instance_id) {
            Some(slot) => outcome.placed.push((item.instance_id, slot)),
            None => {
                log::warn!(
                    "[SortEngine] Item {} ('{}' x{}) no longer fits, returning it to the player.",
                    item.instance_id, item.display_name, item.amount
                );
                recipient.give_item(item.instance_id);
                outcome.returned_to_player.push(item.instance_id);
            }
        }
    }
    outcome
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use super::SortableItem;
    use crate::inventory_management::{ItemContainer, ItemRecipient};

    /// In-memory container. Items keep their data while "removed" so they
    /// can be re-inserted.
    pub struct MemoryContainer {
        pub capacity: u16,
        pub slots: BTreeMap<u16, SortableItem>,
        pub detached: Vec<SortableItem>,
    }

    impl MemoryContainer {
        pub fn new(capacity: u16, items: Vec<SortableItem>) -> Self {
            let slots = items.into_iter().map(|item| (item.position, item)).collect();
            Self { capacity, slots, detached: Vec::new() }
        }

        pub fn ordered(&self) -> Vec<SortableItem> {
            self.slots.values().cloned().collect()
        }
    }

    impl ItemContainer for MemoryContainer {
        fn capacity(&self) -> u16 {
            self.capacity
        }

        fn items(&self) -> Vec<SortableItem> {
            self.ordered()
        }

        fn remove_item(&mut self, instance_id: u64) {
            let slot = self
                .slots
                .iter()
                .find(|(_, item)| item.instance_id == instance_id)
                .map(|(slot, _)| *slot);
            if let Some(item) = slot.and_then(|slot| self.slots.remove(&slot)) {
                self.detached.push(item);
            }
        }

        fn insert_into_first_free_slot(&mut self, instance_id: u64) -> Option<u16> {
            let slot = (0..self.capacity()).find(|slot| !self.slots.contains_key(slot))?;
            let index = self.detached.iter().position(|item| item.instance_id == instance_id)?;
            let mut item = self.detached.swap_remove(index);
            item.position = slot;
            self.slots.insert(slot, item);
            Some(slot)
        }
    }

    #[derive(Default)]
    pub struct MemoryPlayer {
        pub received: Vec<u64>,
    }

    impl ItemRecipient for MemoryPlayer {
        fn give_item(&mut self, instance_id: u64) {
            self.received.push(instance_id);
        }
    }
}
