//! Attendance session entity and insert DTO.

use serde::Serialize;
use sitelog_core::attendance::{SessionSource, SessionState};
use sitelog_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One continuous presence interval of one person on one project.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceSession {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub person_id: DbId,
    pub check_in_ts: Timestamp,
    pub check_out_ts: Option<Timestamp>,
    pub source: String,
    pub corrected: bool,
    pub integrity_hash: String,
    pub time_entry_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AttendanceSession {
    /// The hashed content of this row.
    pub fn state(&self) -> SessionState {
        SessionState {
            person_id: self.person_id,
            project_id: self.project_id,
            check_in_ts: self.check_in_ts,
            check_out_ts: self.check_out_ts,
            corrected: self.corrected,
        }
    }

    pub fn is_open(&self) -> bool {
        self.check_out_ts.is_none()
    }

    /// Whether the stored integrity hash matches the row's current content.
    pub fn hash_is_valid(&self) -> bool {
        self.state().fingerprint() == self.integrity_hash
    }
}

/// DTO for inserting a session. The hash is derived from `state`.
#[derive(Debug, Clone)]
pub struct CreateAttendanceSession {
    pub org_id: DbId,
    pub state: SessionState,
    pub source: SessionSource,
    pub time_entry_id: Option<DbId>,
}
