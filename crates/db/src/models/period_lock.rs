//! Period lock entity and DTOs.

use serde::Serialize;
use sitelog_core::period::PeriodRange;
use sitelog_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

/// A frozen (or previously frozen) invoicing window for a project.
///
/// `locked_by`, `locked_at` and `hash_signature` are cleared on unlock; the
/// row is kept and re-used if the same range is locked again.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PeriodLock {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub period_start: Date,
    pub period_end: Date,
    pub locked: bool,
    pub locked_by: Option<DbId>,
    pub locked_at: Option<Timestamp>,
    pub reason: Option<String>,
    pub hash_signature: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PeriodLock {
    pub fn range(&self) -> PeriodRange {
        PeriodRange {
            start: self.period_start,
            end: self.period_end,
        }
    }
}

/// DTO for locking a range.
#[derive(Debug, Clone)]
pub struct CreatePeriodLock {
    pub org_id: DbId,
    pub project_id: DbId,
    pub range: PeriodRange,
    pub locked_by: DbId,
    pub reason: Option<String>,
    pub hash_signature: Option<String>,
}
