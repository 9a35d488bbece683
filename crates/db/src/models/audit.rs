//! Audit log entity (default audit sink). Immutable once created.

use serde::{Deserialize, Serialize};
use sitelog_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub org_id: DbId,
    pub actor_id: Option<DbId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
    pub occurred_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for inserting an audit log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuditLog {
    pub org_id: DbId,
    pub actor_id: Option<DbId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
    pub occurred_at: Timestamp,
}
