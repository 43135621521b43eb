// server/src/preferences.rs
//
// Per-player sort preferences. Players without a stored record read the
// configured defaults; a record is only created when a player changes a
// setting.

use spacetimedb::{Identity, ReducerContext, Table};
use log;

use crate::permissions::ensure_admin;

#[spacetimedb::table(name = player_sort_preference, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSortPreference {
    #[primary_key]
    pub player_identity: Identity,
    pub sorting_enabled: bool,
    pub sort_by_category: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreferenceDefaults {
    pub sorting_enabled: bool,
    pub sort_by_category: bool,
}

/// What a player's preferences resolve to, without touching the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreferenceView {
    pub sorting_enabled: bool,
    pub sort_by_category: bool,
}

pub(crate) trait PreferenceStore {
    fn find(&self, player: Identity) -> Option<PlayerSortPreference>;
    fn insert(&mut self, preference: PlayerSortPreference);
    fn update(&mut self, preference: PlayerSortPreference);
}

/// Read-only lookup. Never creates a record.
pub(crate) fn preference_view<S: PreferenceStore + ?Sized>(
    store: &S,
    player: Identity,
    defaults: PreferenceDefaults,
) -> PreferenceView {
    match store.find(player) {
        Some(stored) => PreferenceView {
            sorting_enabled: stored.sorting_enabled,
            sort_by_category: stored.sort_by_category,
        },
        None => PreferenceView {
            sorting_enabled: defaults.sorting_enabled,
            sort_by_category: defaults.sort_by_category,
        },
    }
}

pub(crate) fn get_or_create<S: PreferenceStore + ?Sized>(
    store: &mut S,
    player: Identity,
    defaults: PreferenceDefaults,
) -> PlayerSortPreference {
    if let Some(stored) = store.find(player) {
        return stored;
    }
    let created = PlayerSortPreference {
        player_identity: player,
        sorting_enabled: defaults.sorting_enabled,
        sort_by_category: defaults.sort_by_category,
    };
    store.insert(created.clone());
    log::debug!("[Prefs] Created preference record for {:?}.", player);
    created
}

/// Returns the new value.
pub(crate) fn toggle_sorting_enabled<S: PreferenceStore + ?Sized>(
    store: &mut S,
    player: Identity,
    defaults: PreferenceDefaults,
) -> bool {
    let mut preference = get_or_create(store, player, defaults);
    preference.sorting_enabled = !preference.sorting_enabled;
    let enabled = preference.sorting_enabled;
    store.update(preference);
    log::info!("[Prefs] {:?} set sorting_enabled = {}.", player, enabled);
    enabled
}

/// Returns the new value.
pub(crate) fn toggle_sort_by_category<S: PreferenceStore + ?Sized>(
    store: &mut S,
    player: Identity,
    defaults: PreferenceDefaults,
) -> bool {
    let mut preference = get_or_create(store, player, defaults);
    preference.sort_by_category = !preference.sort_by_category;
    let by_category = preference.sort_by_category;
    store.update(preference);
    log::info!("[Prefs] {:?} set sort_by_category = {}.", player, by_category);
    by_category
}

// --- Table-backed store ---

pub(crate) struct DbPreferenceStore<'a> {
    pub ctx: &'a ReducerContext,
}

impl PreferenceStore for DbPreferenceStore<'_> {
    fn find(&self, player: Identity) -> Option<PlayerSortPreference> {
        self.ctx.db.player_sort_preference().player_identity().find(player)
    }

    fn insert(&mut self, preference: PlayerSortPreference) {
        if let Err(e) = self.ctx.db.player_sort_preference().try_insert(preference) {
            log::error!("[Prefs] Failed to store preference record: {}", e);
        }
    }

    fn update(&mut self, preference: PlayerSortPreference) {
        self.ctx.db.player_sort_preference().player_identity().update(preference);
    }
}

// --- Reducers ---

/// Wipes every stored preference; everyone falls back to the configured defaults.
#[spacetimedb::reducer]
pub fn reset_sort_preferences(ctx: &ReducerContext) -> Result<(), String> {
    ensure_admin(ctx)?;
    let preferences = ctx.db.player_sort_preference();
    let identities: Vec<Identity> = preferences.iter().map(|p| p.player_identity).collect();
    for identity in &identities {
        preferences.player_identity().delete(identity);
    }
    log::warn!("[Prefs] Preference store reset by {:?} ({} records removed).", ctx.sender, identities.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    impl PreferenceStore for HashMap<Identity, PlayerSortPreference> {
        fn find(&self, player: Identity) -> Option<PlayerSortPreference> {
            self.get(&player).cloned()
        }

        fn insert(&mut self, preference: PlayerSortPreference) {
            HashMap::insert(self, preference.player_identity, preference);
        }

        fn update(&mut self, preference: PlayerSortPreference) {
            HashMap::insert(self, preference.player_identity, preference);
        }
    }

    const DEFAULTS: PreferenceDefaults = PreferenceDefaults {
        sorting_enabled: true,
        sort_by_category: true,
    };

    fn player(n: u8) -> Identity {
        Identity::from_byte_array([n; 32])
    }

    #[test]
    fn view_uses_defaults_without_allocating() {
        let store: HashMap<Identity, PlayerSortPreference> = HashMap::new();
        let view = preference_view(&store, player(1), DEFAULTS);
        assert!(view.sorting_enabled);
        assert!(view.sort_by_category);
        assert!(store.is_empty());
    }

    #[test]
    fn toggling_promotes_into_store() {
        let mut store: HashMap<Identity, PlayerSortPreference> = HashMap::new();
        assert!(!toggle_sorting_enabled(&mut store, player(1), DEFAULTS));
        assert_eq!(store.len(), 1);

        let view = preference_view(&store, player(1), DEFAULTS);
        assert!(!view.sorting_enabled);
        assert!(view.sort_by_category);
        assert!(store.contains_key(&player(1)));

        // Other players still see the untouched defaults.
        let other = preference_view(&store, player(2), DEFAULTS);
        assert!(other.sorting_enabled);
        assert!(!store.contains_key(&player(2)));
    }

    #[test]
    fn toggle_sort_mode_twice_restores_value() {
        let mut store: HashMap<Identity, PlayerSortPreference> = HashMap::new();
        assert!(!toggle_sort_by_category(&mut store, player(3), DEFAULTS));
        assert!(toggle_sort_by_category(&mut store, player(3), DEFAULTS));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_or_create_keeps_existing_record() {
        let mut store: HashMap<Identity, PlayerSortPreference> = HashMap::new();
        toggle_sort_by_category(&mut store, player(4), DEFAULTS);
        let other_defaults = PreferenceDefaults { sorting_enabled: false, sort_by_category: true };
        let stored = get_or_create(&mut store, player(4), other_defaults);
        assert!(stored.sorting_enabled);
        assert!(!stored.sort_by_category);
    }
}
