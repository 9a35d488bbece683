//! Raw time-tracking entries consumed by reconciliation.

use serde::Serialize;
use sitelog_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeEntry {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub person_id: DbId,
    pub started_at: Timestamp,
    pub stopped_at: Option<Timestamp>,
}
