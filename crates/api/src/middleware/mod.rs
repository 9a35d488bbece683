//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller named by a valid JWT Bearer token.
//! - [`auth::OrgMember`] -- the caller's verified, active organisation membership.
//! - [`rbac`] -- minimum-role extractors built on [`auth::OrgMember`].

pub mod auth;
pub mod rbac;
