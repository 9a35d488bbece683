//! Audit action and entity-type names for ledger transitions.
//!
//! Lives in `core` so the API, worker and event crates agree on the strings
//! written to the audit sink.

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

/// Known actions recorded for attendance and period-lock transitions.
pub mod actions {
    pub const CHECK_IN: &str = "attendance.check_in";
    pub const CHECK_OUT: &str = "attendance.check_out";
    pub const CORRECT: &str = "attendance.correct";
    pub const RECONCILE: &str = "attendance.reconcile";
    pub const PERIOD_LOCK: &str = "period.lock";
    pub const PERIOD_UNLOCK: &str = "period.unlock";
    pub const EXPORT: &str = "attendance.export";
}

// ---------------------------------------------------------------------------
// Entity type constants
// ---------------------------------------------------------------------------

pub mod entity_types {
    pub const ATTENDANCE_SESSION: &str = "attendance_session";
    pub const PERIOD_LOCK: &str = "period_lock";
    pub const PROJECT: &str = "project";
}

/// Whether an action mutates ledger state (as opposed to reading it).
pub fn is_mutating(action: &str) -> bool {
    !matches!(action, actions::EXPORT)
}
