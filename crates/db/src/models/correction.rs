//! Correction log entries. Immutable once created (no update DTO).

use serde::Serialize;
use sitelog_core::attendance::CorrectionField;
use sitelog_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One field-level edit of a session timestamp.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CorrectionLogEntry {
    pub id: DbId,
    pub org_id: DbId,
    pub session_id: DbId,
    pub field: String,
    pub old_value: Option<Timestamp>,
    pub new_value: Timestamp,
    pub reason: String,
    pub changed_by: DbId,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateCorrection {
    pub org_id: DbId,
    pub session_id: DbId,
    pub field: CorrectionField,
    pub old_value: Option<Timestamp>,
    pub new_value: Timestamp,
    pub reason: String,
    pub changed_by: DbId,
}
