//! Reconciliation collisions awaiting operator review.

use serde::Serialize;
use sitelog_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewFlag {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub person_id: DbId,
    pub time_entry_id: DbId,
    pub existing_session_id: Option<DbId>,
    pub reason: String,
    pub resolved: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateReviewFlag {
    pub org_id: DbId,
    pub project_id: DbId,
    pub person_id: DbId,
    pub time_entry_id: DbId,
    pub existing_session_id: Option<DbId>,
    pub reason: String,
}
