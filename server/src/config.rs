// server/src/config.rs
//
// Module configuration, stored as a singleton row, and the registry of
// container types that get a sort button.

use spacetimedb::{ReducerContext, Table};
use log;

use crate::ally::AllyRules;
use crate::permissions::ensure_admin;
use crate::preferences::PreferenceDefaults;

const CONFIG_ROW_ID: u32 = 0;
pub const DEFAULT_COMMAND: &str = "sortbutton";
pub const DEFAULT_OFFSET_X: f32 = 476.5;

const DEFAULT_CONTAINER_PREFABS: [&str; 17] = [
    "assets/content/vehicles/boats/rhib/subents/rhib_storage.prefab",
    "assets/content/vehicles/boats/rowboat/subents/rowboat_storage.prefab",
    "assets/content/vehicles/modularcar/subents/modular_car_1mod_storage.prefab",
    "assets/content/vehicles/modularcar/subents/modular_car_camper_storage.prefab",
    "assets/content/vehicles/snowmobiles/subents/snowmobileitemstorage.prefab",
    "assets/content/vehicles/submarine/subents/submarineitemstorage.prefab",
    "assets/prefabs/deployable/composter/composter.prefab",
    "assets/prefabs/deployable/dropbox/dropbox.deployed.prefab",
    "assets/prefabs/deployable/fridge/fridge.deployed.prefab",
    "assets/prefabs/deployable/hitch & trough/hitchtrough.deployed.prefab",
    "assets/prefabs/deployable/hot air balloon/subents/hab_storage.prefab",
    "assets/prefabs/deployable/large wood storage/box.wooden.large.prefab",
    "assets/prefabs/deployable/small stash/small_stash_deployed.prefab",
    "assets/prefabs/deployable/tool cupboard/cupboard.tool.deployed.prefab",
    "assets/prefabs/deployable/vendingmachine/vendingmachine.deployed.prefab",
    "assets/prefabs/deployable/woodenbox/woodbox_deployed.prefab",
    "assets/prefabs/misc/halloween/coffin/coffinstorage.prefab",
];

#[spacetimedb::table(name = sort_button_config)]
#[derive(Clone, Debug, PartialEq)]
pub struct SortButtonConfig {
    #[primary_key]
    pub id: u32,
    pub default_enabled: bool,
    pub default_sort_by_category: bool,
    pub check_ownership: bool,
    pub use_clans: bool,
    pub use_friends: bool,
    pub use_teams: bool,
    pub grant_permission_on_register: bool,
    pub commands: Vec<String>,
}

impl SortButtonConfig {
    pub fn defaults() -> Self {
        Self {
            id: CONFIG_ROW_ID,
            default_enabled: true,
            default_sort_by_category: true,
            check_ownership: true,
            use_clans: true,
            use_friends: true,
            use_teams: true,
            grant_permission_on_register: true,
            commands: vec![DEFAULT_COMMAND.to_string()],
        }
    }

    /// Every command alias must be a single non-empty word.
    pub fn is_valid(&self) -> bool {
        !self.commands.is_empty()
            && self.commands.iter().all(|c| !c.is_empty() && !c.chars().any(char::is_whitespace))
    }

    pub fn preference_defaults(&self) -> PreferenceDefaults {
        PreferenceDefaults {
            sorting_enabled: self.default_enabled,
            sort_by_category: self.default_sort_by_category,
        }
    }

    pub fn ally_rules(&self) -> AllyRules {
        AllyRules {
            use_teams: self.use_teams,
            use_clans: self.use_clans,
            use_friends: self.use_friends,
        }
    }

    pub fn primary_command(&self) -> &str {
        self.commands.first().map_or(DEFAULT_COMMAND, String::as_str)
    }
}

/// Registry entry: keyed by skin id when set, otherwise by prefab name.
#[spacetimedb::table(name = container_type_config, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerTypeConfig {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub prefab_name: Option<String>,
    pub skin_id: Option<u64>,
    pub enabled: bool,
    pub offset_x: f32,
}

/// Loads the config row. A missing or invalid row is replaced with defaults
/// and persisted so the module keeps working.
pub(crate) fn load_config(ctx: &ReducerContext) -> SortButtonConfig {
    let configs = ctx.db.sort_button_config();
    match configs.id().find(CONFIG_ROW_ID) {
        Some(config) if config.is_valid() => config,
        Some(config) => {
            log::warn!("[Config] Stored configuration is invalid ({:?}); resetting to defaults.", config.commands);
            let defaults = SortButtonConfig::defaults();
            configs.id().update(defaults.clone());
            defaults
        }
        None => {
            log::warn!("[Config] No configuration found; writing defaults.");
            let defaults = SortButtonConfig::defaults();
            if let Err(e) = configs.try_insert(defaults.clone()) {
                log::error!("[Config] Failed to persist default configuration: {}", e);
            }
            defaults
        }
    }
}

/// Skin id wins over prefab name. Absence means the container type is unsupported.
pub fn find_container_type(
    configs: impl IntoIterator<Item = ContainerTypeConfig>,
    skin_id: u64,
    prefab_name: &str,
) -> Option<ContainerTypeConfig> {
    let mut by_prefab = None;
    for config in configs {
        if skin_id != 0 && config.skin_id == Some(skin_id) {
            return Some(config);
        }
        if by_prefab.is_none() && config.skin_id.is_none() && config.prefab_name.as_deref() == Some(prefab_name) {
            by_prefab = Some(config);
        }
    }
    by_prefab
}

pub(crate) fn container_type_for(ctx: &ReducerContext, skin_id: u64, prefab_name: &str) -> Option<ContainerTypeConfig> {
    find_container_type(ctx.db.container_type_config().iter(), skin_id, prefab_name)
}

pub(crate) fn seed_config(ctx: &ReducerContext) {
    let config = load_config(ctx);
    log::info!("[Config] Active configuration: {:?}", config);

    let container_types = ctx.db.container_type_config();
    if container_types.iter().count() > 0 {
        log::info!("[Config] Container types already seeded ({}). Skipping.", container_types.iter().count());
        return;
    }
    for prefab_name in DEFAULT_CONTAINER_PREFABS {
        container_types.insert(ContainerTypeConfig {
            id: 0, // Auto-incremented
            prefab_name: Some(prefab_name.to_string()),
            skin_id: None,
            enabled: true,
            offset_x: DEFAULT_OFFSET_X,
        });
    }
    log::info!("[Config] Seeded {} container types.", DEFAULT_CONTAINER_PREFABS.len());
}

// --- Reducers ---

#[spacetimedb::reducer]
pub fn update_sort_button_config(
    ctx: &ReducerContext,
    default_enabled: bool,
    default_sort_by_category: bool,
    check_ownership: bool,
    use_clans: bool,
    use_friends: bool,
    use_teams: bool,
    grant_permission_on_register: bool,
    commands: Vec<String>,
) -> Result<(), String> {
    ensure_admin(ctx)?;
    let updated = SortButtonConfig {
        id: CONFIG_ROW_ID,
        default_enabled,
        default_sort_by_category,
        check_ownership,
        use_clans,
        use_friends,
        use_teams,
        grant_permission_on_register,
        commands: commands.into_iter().map(|c| c.trim().trim_start_matches('/').to_lowercase()).collect(),
    };
    if !updated.is_valid() {
        return Err("At least one single-word command is required".to_string());
    }

    // Make sure the row exists before updating it.
    load_config(ctx);
    ctx.db.sort_button_config().id().update(updated);
    log::info!("[Config] Configuration changes saved by {:?}.", ctx.sender);
    Ok(())
}

#[spacetimedb::reducer]
pub fn set_container_type_config(
    ctx: &ReducerContext,
    prefab_name: Option<String>,
    skin_id: Option<u64>,
    enabled: bool,
    offset_x: f32,
) -> Result<(), String> {
    ensure_admin(ctx)?;
    let skin_id = skin_id.filter(|id| *id != 0);
    if prefab_name.is_none() && skin_id.is_none() {
        return Err("Either a prefab name or a skin id is required".to_string());
    }
    if !offset_x.is_finite() {
        return Err("offset_x must be a finite number".to_string());
    }

    let container_types = ctx.db.container_type_config();
    let existing = container_types.iter().find(|c| match skin_id {
        Some(id) => c.skin_id == Some(id),
        None => c.skin_id.is_none() && c.prefab_name == prefab_name,
    });

    match existing {
        Some(mut config) => {
            config.enabled = enabled;
            config.offset_x = offset_x;
            log::info!("[Config] Updated container type {:?}/{:?}.", config.prefab_name, config.skin_id);
            container_types.id().update(config);
        }
        None => {
            log::info!("[Config] Registered container type {:?}/{:?}.", prefab_name, skin_id);
            container_types.insert(ContainerTypeConfig {
                id: 0, // Auto-incremented
                prefab_name: if skin_id.is_some() { None } else { prefab_name },
                skin_id,
                enabled,
                offset_x,
            });
        }
    }
    Ok(())
}

#[spacetimedb::reducer]
pub fn remove_container_type_config(ctx: &ReducerContext, config_id: u64) -> Result<(), String> {
    ensure_admin(ctx)?;
    if !ctx.db.container_type_config().id().delete(config_id) {
        return Err(format!("Container type config {} not found", config_id));
    }
    log::info!("[Config] Removed container type config {}.", config_id);
    Ok(())
}
