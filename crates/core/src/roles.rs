//! Organisation role names and their ordering.
//!
//! These must match the `CHECK` constraint on `org_members.role` in
//! `20250101000002_create_org_members.sql`.

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_WORKER: &str = "worker";

/// Privilege rank of a role; higher outranks lower. Unknown roles rank 0.
pub fn rank(role: &str) -> u8 {
    match role {
        ROLE_OWNER => 4,
        ROLE_ADMIN => 3,
        ROLE_SUPERVISOR => 2,
        ROLE_WORKER => 1,
        _ => 0,
    }
}

/// Whether `role` is at least as privileged as `required`.
pub fn at_least(role: &str, required: &str) -> bool {
    rank(role) > 0 && rank(role) >= rank(required)
}
