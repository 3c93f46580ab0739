//! Well-known role name constants.
//!
//! These must match the `ck_users_role` check constraint in the initial
//! migration.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_REQUESTER: &str = "requester";
pub const ROLE_WORKER: &str = "worker";

/// All valid role names.
pub const ALL_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_REQUESTER, ROLE_WORKER];

/// Staff members may manage projects and batches and download results.
pub fn is_staff(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_REQUESTER
}

/// Returns `true` if `role` is one of [`ALL_ROLES`].
pub fn is_valid_role(role: &str) -> bool {
    ALL_ROLES.contains(&role)
}
