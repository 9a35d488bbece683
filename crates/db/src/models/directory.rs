//! Read-only views of tenant tables owned by the surrounding product.

use serde::Serialize;
use sitelog_core::types::DbId;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub org_id: DbId,
    pub name: String,
    pub attendance_enabled: bool,
}

/// A person's membership in an organisation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrgMember {
    pub id: DbId,
    pub org_id: DbId,
    pub person_id: DbId,
    pub role: String,
    pub is_active: bool,
}
