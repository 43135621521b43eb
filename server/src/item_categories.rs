// server/src/item_categories.rs
//
// Sort ranks for item categories. Categories are ranked by the lexicographic
// order of their canonical names, so a category sort reads alphabetically no
// matter how the host happens to declare the enum.

use std::sync::OnceLock;

use crate::items::ItemCategory;

static CATEGORY_ORDER: OnceLock<CategoryOrderTable> = OnceLock::new();

/// The table for this module instance, built on first use.
pub fn category_order() -> &'static CategoryOrderTable {
    CATEGORY_ORDER.get_or_init(CategoryOrderTable::new)
}

/// Maps every `ItemCategory` to a dense rank `0..N`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryOrderTable {
    rank_by_index: [u8; ItemCategory::ALL.len()],
}

impl CategoryOrderTable {
    /// Builds the table from the full category list. Pure; calling it again
    /// yields an identical table.
    pub fn new() -> Self {
        let mut categories = ItemCategory::ALL;
        categories.sort_by(|a, b| a.name().cmp(b.name()));

        let mut rank_by_index = [0u8; ItemCategory::ALL.len()];
        for (rank, category) in categories.iter().enumerate() {
            rank_by_index[category.index()] = rank as u8;
        }
        Self { rank_by_index }
    }

    #[inline]
    pub fn rank(&self, category: ItemCategory) -> u8 {
        self.rank_by_index[category.index()]
    }
}

impl Default for CategoryOrderTable {
    fn default() -> Self {
        Self::new()
    }
}
