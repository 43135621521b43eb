// server/src/permissions.rs
//
// Admin list and named permission grants.

use spacetimedb::{Identity, ReducerContext, Table};
use log;

pub const PERMISSION_USE: &str = "sortbutton.use";

#[spacetimedb::table(name = admin)]
#[derive(Clone, Debug)]
pub struct Admin {
    #[primary_key]
    pub identity: Identity,
}

#[spacetimedb::table(name = permission_grant)]
#[derive(Clone, Debug)]
pub struct PermissionGrant {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub identity: Identity,
    pub permission: String,
}

pub(crate) fn seed_admin(ctx: &ReducerContext, identity: Identity) {
    if ctx.db.admin().identity().find(identity).is_none() {
        log::info!("[Permissions] Registering {:?} as admin.", identity);
        ctx.db.admin().insert(Admin { identity });
    }
}

pub(crate) fn is_admin(ctx: &ReducerContext, identity: Identity) -> bool {
    ctx.db.admin().identity().find(identity).is_some()
}

pub(crate) fn ensure_admin(ctx: &ReducerContext) -> Result<(), String> {
    if is_admin(ctx, ctx.sender) {
        Ok(())
    } else {
        Err("Only admins can do that".to_string())
    }
}

pub(crate) fn has_permission(ctx: &ReducerContext, identity: Identity, permission: &str) -> bool {
    ctx.db.permission_grant().identity().filter(&identity)
        .any(|grant| grant.permission == permission)
}

pub(crate) fn grant(ctx: &ReducerContext, identity: Identity, permission: &str) {
    if has_permission(ctx, identity, permission) {
        return;
    }
    ctx.db.permission_grant().insert(PermissionGrant {
        id: 0, // Auto-incremented
        identity,
        permission: permission.to_string(),
    });
    log::info!("[Permissions] Granted '{}' to {:?}.", permission, identity);
}

// --- Reducers ---

#[spacetimedb::reducer]
pub fn grant_permission(ctx: &ReducerContext, identity: Identity, permission: String) -> Result<(), String> {
    ensure_admin(ctx)?;
    if permission.trim().is_empty() {
        return Err("Permission name cannot be empty".to_string());
    }
    grant(ctx, identity, permission.trim());
    Ok(())
}

#[spacetimedb::reducer]
pub fn revoke_permission(ctx: &ReducerContext, identity: Identity, permission: String) -> Result<(), String> {
    ensure_admin(ctx)?;
    let grants = ctx.db.permission_grant();
    let ids: Vec<u64> = grants.identity().filter(&identity)
        .filter(|grant| grant.permission == permission)
        .map(|grant| grant.id)
        .collect();
    for id in &ids {
        grants.id().delete(id);
    }
    log::info!("[Permissions] Revoked '{}' from {:?} ({} grants removed).", permission, identity, ids.len());
    Ok(())
}
