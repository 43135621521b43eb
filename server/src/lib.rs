use spacetimedb::{Identity, Timestamp, ReducerContext, Table};
use log;

// Declare the modules
mod models;
mod utils;
mod items;
mod item_categories;
mod sort_engine;
mod placement;
mod inventory_management;
mod player_inventory;
mod storage_container;
mod permissions;
mod config;
mod preferences;
mod ally;
mod entity_capabilities;
mod eligibility;
mod lang;
mod overlay;
mod sort_button;
mod chat;

// Import Table Traits needed in this module
use crate::player as PlayerTableTrait; // Needed for ctx.db.player()
use crate::permissions::{ensure_admin, PERMISSION_USE};

// --- World/Player Constants ---
const SPAWN_X: f32 = 640.0;
const SPAWN_Y: f32 = 480.0;
const MAX_STEP_PER_UPDATE: f32 = 64.0;
const MAX_USERNAME_LEN: usize = 24;

// Player table to store position and locale
#[spacetimedb::table(name = player, public)]
#[derive(Clone, Debug)]
pub struct Player {
    #[primary_key]
    pub identity: Identity,
    pub username: String,
    pub position_x: f32,
    pub position_y: f32,
    pub locale: String,
    pub is_dead: bool,
    pub last_update: Timestamp,
}

// --- Lifecycle Reducers ---

// Called once when the module is published or updated
#[spacetimedb::reducer(init)]
pub fn init_module(ctx: &ReducerContext) -> Result<(), String> {
    log::info!("Initializing sort button module...");
    permissions::seed_admin(ctx, ctx.sender);
    config::seed_config(ctx);
    items::seed_items(ctx)?;
    // Build the category ranks up front rather than on the first sort.
    item_categories::category_order();
    log::info!("Module initialization complete.");
    Ok(())
}

#[spacetimedb::reducer(client_connected)]
pub fn identity_connected(ctx: &ReducerContext) -> Result<(), String> {
    log::debug!("Client connected: {:?}", ctx.sender);
    Ok(())
}

// When a client disconnects, drop their loot state, overlay and player row.
// Preferences are kept.
#[spacetimedb::reducer(client_disconnected)]
pub fn identity_disconnected(ctx: &ReducerContext) {
    log::info!("identity_disconnected triggered for identity: {:?}", ctx.sender);
    let sender_id = ctx.sender;
    storage_container::stop_looting(ctx, sender_id);

    let players = ctx.db.player();
    if let Some(player) = players.identity().find(sender_id) {
        players.identity().delete(sender_id);
        log::info!("Removed disconnected player: {} ({:?})", player.username, sender_id);
    }
}

// Register a new player
#[spacetimedb::reducer]
pub fn register_player(ctx: &ReducerContext, username: String, locale: String) -> Result<(), String> {
    log::info!("register_player called by {:?} with username: {}", ctx.sender, username);
    let sender_id = ctx.sender;
    let players = ctx.db.player();
    let username = username.trim().to_string();

    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!("Username must be 1-{} characters.", MAX_USERNAME_LEN));
    }
    if players.iter().any(|p| p.username == username) {
        log::warn!("Username '{}' already taken. Registration failed for {:?}.", username, sender_id);
        return Err(format!("Username '{}' is already taken.", username));
    }
    if players.identity().find(sender_id).is_some() {
        log::warn!("Identity {:?} already registered. Registration failed.", sender_id);
        return Err("Player identity already registered".to_string());
    }

    let player = Player {
        identity: sender_id,
        username: username.clone(),
        position_x: SPAWN_X,
        position_y: SPAWN_Y,
        locale: normalize_locale(&locale),
        is_dead: false,
        last_update: ctx.timestamp,
    };
    players.try_insert(player).map_err(|e| format!("Failed to register player: {}", e))?;
    log::info!("Player registered: {}", username);

    if config::load_config(ctx).grant_permission_on_register {
        permissions::grant(ctx, sender_id, PERMISSION_USE);
    }
    Ok(())
}

fn normalize_locale(locale: &str) -> String {
    let locale = locale.trim();
    if locale.is_empty() {
        lang::DEFAULT_LOCALE.to_string()
    } else {
        locale.to_lowercase()
    }
}

#[spacetimedb::reducer]
pub fn update_player_position(ctx: &ReducerContext, move_dx: f32, move_dy: f32) -> Result<(), String> {
    let players = ctx.db.player();
    let mut player = players.identity().find(ctx.sender)
        .ok_or_else(|| "Player not found".to_string())?;
    if player.is_dead {
        return Err("Player is dead".to_string());
    }
    if !move_dx.is_finite() || !move_dy.is_finite() {
        return Err("Invalid movement".to_string());
    }

    player.position_x += move_dx.clamp(-MAX_STEP_PER_UPDATE, MAX_STEP_PER_UPDATE);
    player.position_y += move_dy.clamp(-MAX_STEP_PER_UPDATE, MAX_STEP_PER_UPDATE);
    player.last_update = ctx.timestamp;
    log::trace!("Player {:?} moved to ({:.1}, {:.1})", ctx.sender, player.position_x, player.position_y);
    players.identity().update(player);
    Ok(())
}

#[spacetimedb::reducer]
pub fn set_locale(ctx: &ReducerContext, locale: String) -> Result<(), String> {
    let players = ctx.db.player();
    let mut player = players.identity().find(ctx.sender)
        .ok_or_else(|| "Player not found".to_string())?;
    player.locale = normalize_locale(&locale);
    log::info!("Player {:?} set locale to '{}'", ctx.sender, player.locale);
    players.identity().update(player);
    Ok(())
}

// --- Admin Reducers ---

#[spacetimedb::reducer]
pub fn set_player_dead(ctx: &ReducerContext, identity: Identity, is_dead: bool) -> Result<(), String> {
    ensure_admin(ctx)?;
    let players = ctx.db.player();
    let mut player = players.identity().find(identity)
        .ok_or_else(|| "Player not found".to_string())?;
    player.is_dead = is_dead;
    player.last_update = ctx.timestamp;
    players.identity().update(player);
    if is_dead {
        storage_container::stop_looting(ctx, identity);
    }
    log::info!("Player {:?} is_dead = {}", identity, is_dead);
    Ok(())
}

#[spacetimedb::reducer]
pub fn grant_item(ctx: &ReducerContext, identity: Identity, item_name: String, quantity: u32) -> Result<(), String> {
    ensure_admin(ctx)?;
    let player = ctx.db.player().identity().find(identity)
        .ok_or_else(|| "Player not found".to_string())?;
    let instance_id = player_inventory::grant_new_item(ctx, &player, &item_name, quantity)?;
    log::info!("Granted {} x{} (instance {}) to {:?}", item_name, quantity, instance_id, identity);
    Ok(())
}
