// server/src/placement.rs
//
// Where the sort button goes on each loot panel layout. Pure lookups over
// static tables; the X offset comes from the container-type config and is
// passed through untouched.

pub const GENERIC_RESIZABLE_PANEL: &str = "generic_resizable";
pub const ANIMAL_STORAGE_PANEL: &str = "animal-storage";

pub const BASE_Y_OFFSET: f32 = 112.0;
pub const Y_OFFSET_PER_ROW: f32 = 62.0;
pub const SLOTS_PER_ROW: u32 = 6;
pub const MAX_ROWS: u32 = 8;

pub const DEFAULT_BUTTON_HEIGHT: f32 = 23.0;
// Some older panels still render 21px rows.
pub const LEGACY_BUTTON_HEIGHT: f32 = 21.0;

/// Y offset by row count; index 0 is one row.
const ROW_OFFSETS: [f32; MAX_ROWS as usize] = [
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 1.0,
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 2.0,
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 3.0,
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 4.0,
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 5.0,
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 6.0,
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 7.0,
    BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 8.0,
];

const FIXED_PANEL_OFFSETS: [(&str, f32); 7] = [
    ("dropboxcontents", BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 2.0),
    ("furnace", 277.0),
    ("generic", BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 6.0),
    ("genericsmall", BASE_Y_OFFSET + Y_OFFSET_PER_ROW),
    ("largefurnace", 395.0),
    ("toolcupboard", 560.0),
    ("vendingmachine.storage", BASE_Y_OFFSET + Y_OFFSET_PER_ROW * 5.0),
];

const HEIGHT_OVERRIDES: [(&str, f32); 5] = [
    ("dropboxcontents", LEGACY_BUTTON_HEIGHT),
    ("furnace", LEGACY_BUTTON_HEIGHT),
    ("largefurnace", LEGACY_BUTTON_HEIGHT),
    ("toolcupboard", LEGACY_BUTTON_HEIGHT),
    ("vendingmachine.storage", LEGACY_BUTTON_HEIGHT),
];

/// Read-only view of a container at the moment a player opens it.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerShape {
    pub capacity: i32,
    pub panel_name: String,
    pub is_restricted_subregion: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderInstruction {
    pub offset_x: f32,
    pub offset_y: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlacementRule {
    /// Panel always renders at the same height.
    Fixed(f32),
    /// Panel grows with slot count; offset depends on the row count.
    ByRowCount,
}

pub fn placement_rule(panel_name: &str) -> Option<PlacementRule> {
    if panel_name == GENERIC_RESIZABLE_PANEL || panel_name == ANIMAL_STORAGE_PANEL {
        return Some(PlacementRule::ByRowCount);
    }
    FIXED_PANEL_OFFSETS
        .iter()
        .find(|(name, _)| *name == panel_name)
        .map(|(_, offset)| PlacementRule::Fixed(*offset))
}

/// `min(ceil(capacity / 6), 8)`, never less than one row.
pub fn row_count(capacity: i32) -> u32 {
    if capacity <= 0 {
        return 1;
    }
    (capacity as u32).div_ceil(SLOTS_PER_ROW).clamp(1, MAX_ROWS)
}

/// Offset for a 1-based row count. Counts past the last row reuse it.
pub fn row_offset(rows: u32) -> f32 {
    let index = rows.clamp(1, MAX_ROWS) as usize - 1;
    ROW_OFFSETS[index]
}

pub fn button_height(panel_name: &str) -> f32 {
    HEIGHT_OVERRIDES
        .iter()
        .find(|(name, _)| *name == panel_name)
        .map_or(DEFAULT_BUTTON_HEIGHT, |(_, height)| *height)
}

/// Returns None for panels without a placement rule; the button is simply not shown.
pub fn resolve_placement(shape: &ContainerShape, offset_x: f32) -> Option<RenderInstruction> {
    let offset_y = match placement_rule(&shape.panel_name)? {
        PlacementRule::Fixed(offset) => offset,
        PlacementRule::ByRowCount => row_offset(row_count(shape.capacity)),
    };
    Some(RenderInstruction {
        offset_x,
        offset_y,
        height: button_height(&shape.panel_name),
    })
}
