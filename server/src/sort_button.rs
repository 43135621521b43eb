// server/src/sort_button.rs
//
// Event glue for the sort button: deciding whether to show it when a player
// opens a container, the deferred show, the two button actions and the chat
// command.

use spacetimedb::{Identity, ReducerContext, Table};
use spacetimedb::spacetimedb_lib::ScheduleAt;
use log;

use crate::ally::{DbAllyLookup, RuleBasedAllies};
use crate::chat::send_system_message;
use crate::config::{container_type_for, load_config, SortButtonConfig};
use crate::eligibility::{self, Ineligible};
use crate::inventory_management::{DbContainer, DbRecipient};
use crate::item_categories::category_order;
use crate::lang::{self, MessageKey};
use crate::overlay::{self, DbOverlaySink, SortButtonOverlay};
use crate::permissions::{has_permission, PERMISSION_USE};
use crate::placement::resolve_placement;
use crate::preferences::{self, DbPreferenceStore, PreferenceView};
use crate::sort_engine::sort_container;
use crate::storage_container::{
    self, container_flags, container_shape, entity_access, player_loot as PlayerLootTableTrait,
    storage_container as StorageContainerTableTrait, storage_entity as StorageEntityTableTrait, PlayerLoot, StorageEntity,
};
use crate::player as PlayerTableTrait;
use crate::Player;

// --- Deferred show ---

/// One-shot job that decides on the sort button after the loot panel has
/// settled. Carries identifiers only; everything is re-read when it runs.
#[spacetimedb::table(name = sort_button_show_schedule, scheduled(show_sort_button_deferred))]
#[derive(Clone, Debug)]
pub struct SortButtonShowSchedule {
    #[primary_key]
    #[auto_inc]
    pub scheduled_id: u64,
    pub scheduled_at: ScheduleAt,
    pub player_identity: Identity,
    pub entity_id: u32,
    pub offset_x: f32,
    pub sort_by_category: bool,
}

/// Result of the entity gate: where the button goes horizontally and which
/// mode it shows.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LootDecision {
    offset_x: f32,
    sort_by_category: bool,
}

fn preference_view_for(ctx: &ReducerContext, config: &SortButtonConfig, player: Identity) -> PreferenceView {
    preferences::preference_view(&DbPreferenceStore { ctx }, player, config.preference_defaults())
}

fn evaluate_entity_gate(
    ctx: &ReducerContext,
    config: &SortButtonConfig,
    player: &Player,
    entity: &StorageEntity,
) -> Result<LootDecision, Ineligible> {
    if !has_permission(ctx, player.identity, PERMISSION_USE) {
        return Err(Ineligible::NoPermission);
    }
    let container_type = container_type_for(ctx, entity.skin_id, &entity.prefab_name);
    let preference = preference_view_for(ctx, config, player.identity);
    let lookup = DbAllyLookup { ctx };
    let allies = RuleBasedAllies { lookup: &lookup, rules: config.ally_rules() };

    let offset_x = eligibility::check_entity_gate(
        container_type.as_ref(),
        &entity_access(entity),
        player.identity,
        (player.position_x, player.position_y),
        config.check_ownership,
        &preference,
        &allies,
    )?;
    Ok(LootDecision { offset_x, sort_by_category: preference.sort_by_category })
}

/// Why a queued show no longer applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StaleShow {
    PlayerGone,
    EntityGone,
    NoLongerLooting,
}

impl std::fmt::Display for StaleShow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StaleShow::PlayerGone => "player gone or dead",
            StaleShow::EntityGone => "entity gone or destroyed",
            StaleShow::NoLongerLooting => "player is no longer looting the entity",
        })
    }
}

/// Re-checks a queued show against the world as it is now: the player must be
/// alive, the entity must still stand and the player must still be looting it.
pub(crate) fn deferred_show_target(
    player: Option<Player>,
    entity: Option<StorageEntity>,
    loot: Option<PlayerLoot>,
) -> Result<(Player, StorageEntity, PlayerLoot), StaleShow> {
    let player = player.filter(|p| !p.is_dead).ok_or(StaleShow::PlayerGone)?;
    let entity = entity.filter(|e| !e.is_destroyed).ok_or(StaleShow::EntityGone)?;
    match loot {
        Some(loot) if loot.player_identity == player.identity && loot.entity_id == entity.id => {
            Ok((player, entity, loot))
        }
        _ => Err(StaleShow::NoLongerLooting),
    }
}

/// Builds the overlay for the loot state the player is in, if the button
/// should be visible.
fn current_overlay(
    ctx: &ReducerContext,
    player: &Player,
    entity: &StorageEntity,
    loot: &PlayerLoot,
    decision: LootDecision,
) -> Option<SortButtonOverlay> {
    if let Err(reason) = eligibility::check_single_container(loot.container_ids.len()) {
        log::debug!("[SortButton] No button for {:?}: {}.", player.identity, reason);
        return None;
    }
    let container = ctx.db.storage_container().id().find(loot.container_ids[0])?;
    if let Err(reason) = eligibility::check_container_sortable(&container_flags(&container)) {
        log::debug!("[SortButton] No button for {:?}: {}.", player.identity, reason);
        return None;
    }

    let shape = container_shape(entity, &container);
    let Some(placement) = resolve_placement(&shape, decision.offset_x) else {
        log::debug!("[SortButton] No placement rule for panel '{}'.", shape.panel_name);
        return None;
    };
    Some(overlay::build_overlay(player.identity, &placement, decision.sort_by_category, &player.locale))
}

fn gate_decision(
    ctx: &ReducerContext,
    config: &SortButtonConfig,
    player: &Player,
    entity: &StorageEntity,
) -> Option<LootDecision> {
    match evaluate_entity_gate(ctx, config, player, entity) {
        Ok(decision) => Some(decision),
        Err(reason) => {
            log::debug!("[SortButton] No button for {:?} on entity {}: {}.", player.identity, entity.id, reason);
            None
        }
    }
}

/// Gate plus overlay for the player's loot state, decided right away.
fn immediate_overlay(
    ctx: &ReducerContext,
    config: &SortButtonConfig,
    player: &Player,
    loot: &PlayerLoot,
) -> Option<SortButtonOverlay> {
    let entity = ctx.db.storage_entity().id().find(loot.entity_id).filter(|e| !e.is_destroyed)?;
    let decision = gate_decision(ctx, config, player, &entity)?;
    current_overlay(ctx, player, &entity, loot, decision)
}

/// Called when a player opens an entity. The gate runs now; the button itself
/// is decided on the next scheduler pass, once the loot panel has settled.
pub(crate) fn handle_loot_entity(ctx: &ReducerContext, player: &Player, entity: &StorageEntity) {
    let config = load_config(ctx);
    let Some(decision) = gate_decision(ctx, &config, player, entity) else {
        return;
    };

    let job = SortButtonShowSchedule {
        scheduled_id: 0, // Auto-incremented
        scheduled_at: ScheduleAt::Time(ctx.timestamp),
        player_identity: player.identity,
        entity_id: entity.id,
        offset_x: decision.offset_x,
        sort_by_category: decision.sort_by_category,
    };
    if let Err(e) = ctx.db.sort_button_show_schedule().try_insert(job) {
        log::error!("[SortButton] Failed to schedule sort button for {:?}: {}", player.identity, e);
    }
}

#[spacetimedb::reducer]
pub fn show_sort_button_deferred(ctx: &ReducerContext, job: SortButtonShowSchedule) -> Result<(), String> {
    if ctx.sender != ctx.identity() {
        return Err("show_sort_button_deferred may only be invoked by the scheduler".to_string());
    }

    // The world may have changed since the job was queued.
    let target = deferred_show_target(
        ctx.db.player().identity().find(job.player_identity),
        ctx.db.storage_entity().id().find(job.entity_id),
        ctx.db.player_loot().player_identity().find(job.player_identity),
    );
    let (player, entity, loot) = match target {
        Ok(target) => target,
        Err(reason) => {
            log::debug!("[SortButton] Dropping stale show for {:?} on entity {}: {}.",
                job.player_identity, job.entity_id, reason);
            return Ok(());
        }
    };

    let decision = LootDecision { offset_x: job.offset_x, sort_by_category: job.sort_by_category };
    if let Some(overlay) = current_overlay(ctx, &player, &entity, &loot, decision) {
        overlay::show_overlay(&mut DbOverlaySink { ctx }, overlay);
    }
    Ok(())
}

// --- Button actions ---

fn find_player(ctx: &ReducerContext) -> Result<Player, String> {
    ctx.db.player().identity().find(ctx.sender)
        .ok_or_else(|| "Player not found".to_string())
}

/// The order button: flips the sort mode and redraws the button so it shows
/// the new mode.
#[spacetimedb::reducer]
pub fn sort_button_order(ctx: &ReducerContext) -> Result<(), String> {
    let player = find_player(ctx)?;
    if !has_permission(ctx, player.identity, PERMISSION_USE) {
        return Ok(());
    }
    let config = load_config(ctx);
    preferences::toggle_sort_by_category(&mut DbPreferenceStore { ctx }, player.identity, config.preference_defaults());
    refresh_sort_button(ctx, &player, &config);
    Ok(())
}

fn refresh_sort_button(ctx: &ReducerContext, player: &Player, config: &SortButtonConfig) {
    let mut sink = DbOverlaySink { ctx };
    let refreshed = ctx.db.player_loot().player_identity().find(player.identity)
        .and_then(|loot| immediate_overlay(ctx, config, player, &loot));
    match refreshed {
        Some(overlay) => overlay::recreate_overlay(&mut sink, overlay),
        None => {
            overlay::hide_overlay(&mut sink, player.identity);
        }
    }
}

/// The sort button itself. Ineligible requests are ignored.
#[spacetimedb::reducer]
pub fn sort_button_sort(ctx: &ReducerContext) -> Result<(), String> {
    let player = find_player(ctx)?;
    let Some(loot) = ctx.db.player_loot().player_identity().find(player.identity) else {
        log::debug!("[SortButton] {:?} pressed sort while not looting.", player.identity);
        return Ok(());
    };
    if let Err(reason) = eligibility::check_single_container(loot.container_ids.len()) {
        log::debug!("[SortButton] Sort ignored for {:?}: {}.", player.identity, reason);
        return Ok(());
    }
    let entity = match storage_container::validate_entity_interaction(ctx, loot.entity_id) {
        Ok((_, entity)) => entity,
        Err(e) => {
            log::debug!("[SortButton] Sort ignored for {:?}: {}.", player.identity, e);
            return Ok(());
        }
    };

    let config = load_config(ctx);
    let decision = match evaluate_entity_gate(ctx, &config, &player, &entity) {
        Ok(decision) => decision,
        Err(reason) => {
            log::debug!("[SortButton] Sort ignored for {:?}: {}.", player.identity, reason);
            return Ok(());
        }
    };

    for container_id in &loot.container_ids {
        let Some(container) = ctx.db.storage_container().id().find(container_id) else {
            continue;
        };
        if let Err(reason) = eligibility::check_container_sortable(&container_flags(&container)) {
            log::debug!("[SortButton] Skipping container {}: {}.", container.id, reason);
            continue;
        }

        let restricted = container_shape(&entity, &container).is_restricted_subregion;
        let mut db_container = DbContainer::load(ctx, &container);
        let mut recipient = DbRecipient { ctx, player: &player };
        let outcome = sort_container(
            &mut db_container,
            &mut recipient,
            decision.sort_by_category,
            restricted,
            category_order(),
        );
        log::info!("[SortButton] {:?} sorted container {} by {} ({} placed, {} returned).",
            player.identity, container.id,
            if decision.sort_by_category { "category" } else { "name" },
            outcome.placed.len(), outcome.returned_to_player.len());
    }
    Ok(())
}

// --- Chat command ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortCommand {
    ToggleEnabled,
    ToggleSortType,
    Help,
}

pub fn parse_sort_command(args: &[String]) -> SortCommand {
    match args.first().map(|a| a.to_lowercase()) {
        None => SortCommand::ToggleEnabled,
        Some(arg) if arg == "sort" || arg == "type" => SortCommand::ToggleSortType,
        Some(_) => SortCommand::Help,
    }
}

fn reply(ctx: &ReducerContext, player: &Player, text: String) {
    let prefix = lang::message(&player.locale, MessageKey::Prefix);
    send_system_message(ctx, player.identity, format!("{}{}", prefix, text));
}

/// Runs `/sortbutton [args]` for the sender.
pub(crate) fn run_command(ctx: &ReducerContext, args: &[String]) -> Result<(), String> {
    let player = find_player(ctx)?;
    let locale = player.locale.clone();
    if !has_permission(ctx, player.identity, PERMISSION_USE) {
        reply(ctx, &player, lang::message(&locale, MessageKey::NoPermission).to_string());
        return Ok(());
    }

    let config = load_config(ctx);
    let defaults = config.preference_defaults();
    let mut store = DbPreferenceStore { ctx };
    let text = match parse_sort_command(args) {
        SortCommand::ToggleEnabled => {
            let enabled = preferences::toggle_sorting_enabled(&mut store, player.identity, defaults);
            let state = lang::message(&locale, if enabled { MessageKey::Enabled } else { MessageKey::Disabled });
            lang::format_message(&locale, MessageKey::ButtonStatus, state)
        }
        SortCommand::ToggleSortType => {
            let by_category = preferences::toggle_sort_by_category(&mut store, player.identity, defaults);
            let mode = lang::message(&locale, if by_category { MessageKey::Category } else { MessageKey::Name });
            lang::format_message(&locale, MessageKey::SortType, mode)
        }
        SortCommand::Help => lang::format_message(&locale, MessageKey::Help, config.primary_command()),
    };
    reply(ctx, &player, text);
    Ok(())
}

#[spacetimedb::reducer]
pub fn sortbutton_command(ctx: &ReducerContext, args: Vec<String>) -> Result<(), String> {
    run_command(ctx, &args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn no_args_toggles_the_button() {
        assert_eq!(parse_sort_command(&[]), SortCommand::ToggleEnabled);
    }

    #[test]
    fn sort_and_type_toggle_the_mode() {
        assert_eq!(parse_sort_command(&args(&["sort"])), SortCommand::ToggleSortType);
        assert_eq!(parse_sort_command(&args(&["TYPE"])), SortCommand::ToggleSortType);
        assert_eq!(parse_sort_command(&args(&["type", "extra"])), SortCommand::ToggleSortType);
    }

    fn identity(n: u8) -> Identity {
        Identity::from_byte_array([n; 32])
    }

    fn player(n: u8) -> Player {
        Player {
            identity: identity(n),
            username: format!("player{}", n),
            position_x: 0.0,
            position_y: 0.0,
            locale: "en".to_string(),
            is_dead: false,
            last_update: spacetimedb::Timestamp::UNIX_EPOCH,
        }
    }

    fn entity(id: u32) -> StorageEntity {
        StorageEntity {
            id,
            prefab_name: "box.wooden.large".to_string(),
            skin_id: 0,
            kind: crate::models::EntityKind::Generic,
            panel_name: None,
            owner_panel: None,
            owner_id: None,
            pos_x: 0.0,
            pos_y: 0.0,
            facing_radians: 0.0,
            is_destroyed: false,
        }
    }

    fn looting(n: u8, entity_id: u32) -> PlayerLoot {
        PlayerLoot { player_identity: identity(n), entity_id, container_ids: vec![entity_id * 10] }
    }

    #[test]
    fn queued_show_runs_while_player_still_loots_the_entity() {
        let (p, e, loot) = deferred_show_target(Some(player(1)), Some(entity(5)), Some(looting(1, 5))).unwrap();
        assert_eq!(p.identity, identity(1));
        assert_eq!(e.id, 5);
        assert_eq!(loot.container_ids, vec![50]);
    }

    #[test]
    fn queued_show_is_dropped_when_player_left_or_died() {
        assert_eq!(
            deferred_show_target(None, Some(entity(5)), Some(looting(1, 5))).unwrap_err(),
            StaleShow::PlayerGone
        );
        let dead = Player { is_dead: true, ..player(1) };
        assert_eq!(
            deferred_show_target(Some(dead), Some(entity(5)), Some(looting(1, 5))).unwrap_err(),
            StaleShow::PlayerGone
        );
    }

    #[test]
    fn queued_show_is_dropped_when_entity_is_gone() {
        assert_eq!(
            deferred_show_target(Some(player(1)), None, Some(looting(1, 5))).unwrap_err(),
            StaleShow::EntityGone
        );
        let destroyed = StorageEntity { is_destroyed: true, ..entity(5) };
        assert_eq!(
            deferred_show_target(Some(player(1)), Some(destroyed), Some(looting(1, 5))).unwrap_err(),
            StaleShow::EntityGone
        );
    }

    #[test]
    fn queued_show_is_dropped_when_player_moved_on() {
        assert_eq!(
            deferred_show_target(Some(player(1)), Some(entity(5)), None).unwrap_err(),
            StaleShow::NoLongerLooting
        );
        assert_eq!(
            deferred_show_target(Some(player(1)), Some(entity(5)), Some(looting(1, 6))).unwrap_err(),
            StaleShow::NoLongerLooting
        );
        assert_eq!(
            deferred_show_target(Some(player(1)), Some(entity(5)), Some(looting(2, 5))).unwrap_err(),
            StaleShow::NoLongerLooting
        );
    }

    #[test]
    fn anything_else_is_help() {
        assert_eq!(parse_sort_command(&args(&["help"])), SortCommand::Help);
        assert_eq!(parse_sort_command(&args(&["on"])), SortCommand::Help);
    }
}
