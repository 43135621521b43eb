// server/src/ally.rs
//
// Who counts as an ally of a container owner: same team, same or allied
// clan, or listed as a friend by the owner. Each source can be switched off
// in the config.

use spacetimedb::{Identity, ReducerContext, Table};
use log;

use crate::permissions::ensure_admin;

#[spacetimedb::table(name = player_team, public)]
#[derive(Clone, Debug)]
pub struct PlayerTeam {
    #[primary_key]
    pub player_identity: Identity,
    #[index(btree)]
    pub team_id: u64,
}

#[spacetimedb::table(name = clan_member, public)]
#[derive(Clone, Debug)]
pub struct ClanMember {
    #[primary_key]
    pub player_identity: Identity,
    #[index(btree)]
    pub clan_tag: String,
}

/// Stored once per pair with `clan_a < clan_b`.
#[spacetimedb::table(name = clan_alliance, public)]
#[derive(Clone, Debug)]
pub struct ClanAlliance {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub clan_a: String,
    pub clan_b: String,
}

/// One-directional: `owner` lists `friend` as a friend.
#[spacetimedb::table(name = friendship, public)]
#[derive(Clone, Debug)]
pub struct Friendship {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub owner: Identity,
    pub friend: Identity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllyRules {
    pub use_teams: bool,
    pub use_clans: bool,
    pub use_friends: bool,
}

/// Relationship data the ally check reads.
pub(crate) trait AllyLookup {
    fn team_of(&self, player: Identity) -> Option<u64>;
    fn clan_of(&self, player: Identity) -> Option<String>;
    fn clans_allied(&self, clan_a: &str, clan_b: &str) -> bool;
    /// True if `owner` lists `friend` as a friend.
    fn has_friend(&self, owner: Identity, friend: Identity) -> bool;
}

pub(crate) fn is_ally<L: AllyLookup + ?Sized>(lookup: &L, rules: AllyRules, player: Identity, target: Identity) -> bool {
    if player == target {
        return true;
    }

    if rules.use_teams {
        if let (Some(a), Some(b)) = (lookup.team_of(player), lookup.team_of(target)) {
            if a == b {
                return true;
            }
        }
    }

    if rules.use_clans {
        if let (Some(a), Some(b)) = (lookup.clan_of(player), lookup.clan_of(target)) {
            if a == b || lookup.clans_allied(&a, &b) {
                return true;
            }
        }
    }

    rules.use_friends && lookup.has_friend(target, player)
}

/// The boolean answer the eligibility gate needs.
pub(crate) trait AllyResolver {
    fn is_ally(&self, player: Identity, target: Identity) -> bool;
}

pub(crate) struct RuleBasedAllies<'a, L: AllyLookup + ?Sized> {
    pub lookup: &'a L,
    pub rules: AllyRules,
}

impl<L: AllyLookup + ?Sized> AllyResolver for RuleBasedAllies<'_, L> {
    fn is_ally(&self, player: Identity, target: Identity) -> bool {
        is_ally(self.lookup, self.rules, player, target)
    }
}

// --- Table-backed lookup ---

pub(crate) struct DbAllyLookup<'a> {
    pub ctx: &'a ReducerContext,
}

impl AllyLookup for DbAllyLookup<'_> {
    fn team_of(&self, player: Identity) -> Option<u64> {
        self.ctx.db.player_team().player_identity().find(player).map(|t| t.team_id)
    }

    fn clan_of(&self, player: Identity) -> Option<String> {
        self.ctx.db.clan_member().player_identity().find(player).map(|c| c.clan_tag)
    }

    fn clans_allied(&self, clan_a: &str, clan_b: &str) -> bool {
        let (first, second) = ordered_pair(clan_a, clan_b);
        self.ctx.db.clan_alliance().clan_a().filter(first)
            .any(|alliance| alliance.clan_b == second)
    }

    fn has_friend(&self, owner: Identity, friend: Identity) -> bool {
        self.ctx.db.friendship().owner().filter(&owner)
            .any(|f| f.friend == friend)
    }
}

fn ordered_pair<'s>(a: &'s str, b: &'s str) -> (&'s str, &'s str) {
    if a <= b { (a, b) } else { (b, a) }
}

// --- Reducers ---

#[spacetimedb::reducer]
pub fn join_team(ctx: &ReducerContext, team_id: u64) -> Result<(), String> {
    let teams = ctx.db.player_team();
    let row = PlayerTeam { player_identity: ctx.sender, team_id };
    if teams.player_identity().find(ctx.sender).is_some() {
        teams.player_identity().update(row);
    } else {
        teams.insert(row);
    }
    log::info!("[Ally] {:?} joined team {}.", ctx.sender, team_id);
    Ok(())
}

#[spacetimedb::reducer]
pub fn leave_team(ctx: &ReducerContext) -> Result<(), String> {
    if !ctx.db.player_team().player_identity().delete(ctx.sender) {
        return Err("You are not in a team".to_string());
    }
    log::info!("[Ally] {:?} left their team.", ctx.sender);
    Ok(())
}

/// Joins a clan, or leaves the current one when `clan_tag` is empty.
#[spacetimedb::reducer]
pub fn set_clan(ctx: &ReducerContext, clan_tag: String) -> Result<(), String> {
    let clan_tag = clan_tag.trim().to_string();
    let clans = ctx.db.clan_member();
    if clan_tag.is_empty() {
        clans.player_identity().delete(ctx.sender);
        log::info!("[Ally] {:?} left their clan.", ctx.sender);
        return Ok(());
    }
    let row = ClanMember { player_identity: ctx.sender, clan_tag: clan_tag.clone() };
    if clans.player_identity().find(ctx.sender).is_some() {
        clans.player_identity().update(row);
    } else {
        clans.insert(row);
    }
    log::info!("[Ally] {:?} joined clan [{}].", ctx.sender, clan_tag);
    Ok(())
}

#[spacetimedb::reducer]
pub fn set_clan_alliance(ctx: &ReducerContext, clan_a: String, clan_b: String, allied: bool) -> Result<(), String> {
    ensure_admin(ctx)?;
    if clan_a.is_empty() || clan_b.is_empty() || clan_a == clan_b {
        return Err("An alliance needs two different clans".to_string());
    }
    let (first, second) = ordered_pair(&clan_a, &clan_b);
    let alliances = ctx.db.clan_alliance();
    let existing: Vec<u64> = alliances.clan_a().filter(first)
        .filter(|a| a.clan_b == second)
        .map(|a| a.id)
        .collect();

    if allied && existing.is_empty() {
        alliances.insert(ClanAlliance { id: 0, clan_a: first.to_string(), clan_b: second.to_string() });
    } else if !allied {
        for id in &existing {
            alliances.id().delete(id);
        }
    }
    log::info!("[Ally] Alliance [{}] <-> [{}] set to {}.", first, second, allied);
    Ok(())
}

#[spacetimedb::reducer]
pub fn add_friend(ctx: &ReducerContext, friend: Identity) -> Result<(), String> {
    if friend == ctx.sender {
        return Err("You cannot befriend yourself".to_string());
    }
    let friendships = ctx.db.friendship();
    if friendships.owner().filter(&ctx.sender).any(|f| f.friend == friend) {
        return Ok(());
    }
    friendships.insert(Friendship { id: 0, owner: ctx.sender, friend });
    log::info!("[Ally] {:?} added friend {:?}.", ctx.sender, friend);
    Ok(())
}

#[spacetimedb::reducer]
pub fn remove_friend(ctx: &ReducerContext, friend: Identity) -> Result<(), String> {
    let friendships = ctx.db.friendship();
    let ids: Vec<u64> = friendships.owner().filter(&ctx.sender)
        .filter(|f| f.friend == friend)
        .map(|f| f.id)
        .collect();
    if ids.is_empty() {
        return Err("Not on your friends list".to_string());
    }
    for id in &ids {
        friendships.id().delete(id);
    }
    log::info!("[Ally] {:?} removed friend {:?}.", ctx.sender, friend);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    pub(crate) struct MemoryAllies {
        pub teams: HashMap<Identity, u64>,
        pub clans: HashMap<Identity, String>,
        pub alliances: HashSet<(String, String)>,
        pub friends: HashSet<(Identity, Identity)>,
    }

    impl AllyLookup for MemoryAllies {
        fn team_of(&self, player: Identity) -> Option<u64> {
            self.teams.get(&player).copied()
        }

        fn clan_of(&self, player: Identity) -> Option<String> {
            self.clans.get(&player).cloned()
        }

        fn clans_allied(&self, clan_a: &str, clan_b: &str) -> bool {
            let (first, second) = ordered_pair(clan_a, clan_b);
            self.alliances.contains(&(first.to_string(), second.to_string()))
        }

        fn has_friend(&self, owner: Identity, friend: Identity) -> bool {
            self.friends.contains(&(owner, friend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MemoryAllies;
    use super::*;

    const ALL: AllyRules = AllyRules { use_teams: true, use_clans: true, use_friends: true };
    const NONE: AllyRules = AllyRules { use_teams: false, use_clans: false, use_friends: false };

    fn id(n: u8) -> Identity {
        Identity::from_byte_array([n; 32])
    }

    #[test]
    fn same_player_is_always_ally() {
        let lookup = MemoryAllies::default();
        assert!(is_ally(&lookup, NONE, id(1), id(1)));
    }

    #[test]
    fn team_membership() {
        let mut lookup = MemoryAllies::default();
        lookup.teams.insert(id(1), 7);
        lookup.teams.insert(id(2), 7);
        lookup.teams.insert(id(3), 8);
        assert!(is_ally(&lookup, ALL, id(1), id(2)));
        assert!(!is_ally(&lookup, ALL, id(1), id(3)));
        assert!(!is_ally(&lookup, AllyRules { use_teams: false, ..ALL }, id(1), id(2)));
    }

    #[test]
    fn clan_membership_and_alliances() {
        let mut lookup = MemoryAllies::default();
        lookup.clans.insert(id(1), "RED".to_string());
        lookup.clans.insert(id(2), "RED".to_string());
        lookup.clans.insert(id(3), "BLUE".to_string());
        assert!(is_ally(&lookup, ALL, id(1), id(2)));
        assert!(!is_ally(&lookup, ALL, id(1), id(3)));

        lookup.alliances.insert(("BLUE".to_string(), "RED".to_string()));
        assert!(is_ally(&lookup, ALL, id(1), id(3)));
        assert!(is_ally(&lookup, ALL, id(3), id(1)));
        assert!(!is_ally(&lookup, AllyRules { use_clans: false, ..ALL }, id(1), id(3)));
    }

    #[test]
    fn friendship_is_read_from_the_owner_side() {
        let mut lookup = MemoryAllies::default();
        // Owner 2 lists player 1 as a friend.
        lookup.friends.insert((id(2), id(1)));
        assert!(is_ally(&lookup, ALL, id(1), id(2)));
        assert!(!is_ally(&lookup, ALL, id(2), id(1)));
        assert!(!is_ally(&lookup, AllyRules { use_friends: false, ..ALL }, id(1), id(2)));
    }

    #[test]
    fn resolver_wraps_lookup_and_rules() {
        let mut lookup = MemoryAllies::default();
        lookup.teams.insert(id(1), 1);
        lookup.teams.insert(id(2), 1);
        let resolver = RuleBasedAllies { lookup: &lookup, rules: ALL };
        assert!(resolver.is_ally(id(1), id(2)));
        let resolver = RuleBasedAllies { lookup: &lookup, rules: NONE };
        assert!(!resolver.is_ally(id(1), id(2)));
    }
}
