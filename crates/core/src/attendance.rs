//! Attendance session state, transitions and validation.
//!
//! [`SessionState`] is the logical content of a session (the tuple the
//! integrity hash covers). The transition methods here are pure; persistence
//! and locking live in the database and API layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::error::CoreError;
use crate::fingerprint::session_fingerprint;
use crate::types::{to_storage_precision, Date, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum length (after trimming) of a correction or unlock justification.
pub const MIN_REASON_LENGTH: usize = 10;

/// Maximum length of a correction or unlock justification.
pub const MAX_REASON_LENGTH: usize = 2_000;

// ---------------------------------------------------------------------------
// Session source
// ---------------------------------------------------------------------------

/// Provenance of an attendance session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    /// Direct check-in from the site QR code.
    QrScan,
    /// Backfilled from a raw time-tracking entry.
    TimeEntryReconciled,
}

impl SessionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSource::QrScan => "qr_scan",
            SessionSource::TimeEntryReconciled => "time_entry_reconciled",
        }
    }
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qr_scan" => Ok(SessionSource::QrScan),
            "time_entry_reconciled" => Ok(SessionSource::TimeEntryReconciled),
            other => Err(CoreError::Validation(format!(
                "Unknown session source: '{other}'. Valid sources: qr_scan, time_entry_reconciled"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Correction field
// ---------------------------------------------------------------------------

/// The session timestamp a correction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionField {
    CheckInTs,
    CheckOutTs,
}

impl CorrectionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionField::CheckInTs => "check_in_ts",
            CorrectionField::CheckOutTs => "check_out_ts",
        }
    }
}

impl fmt::Display for CorrectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectionField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_in_ts" => Ok(CorrectionField::CheckInTs),
            "check_out_ts" => Ok(CorrectionField::CheckOutTs),
            other => Err(CoreError::Validation(format!(
                "Unknown correction field: '{other}'. Valid fields: check_in_ts, check_out_ts"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The hashed content of an attendance session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub person_id: DbId,
    pub project_id: DbId,
    pub check_in_ts: Timestamp,
    pub check_out_ts: Option<Timestamp>,
    pub corrected: bool,
}

/// Outcome of applying a correction to a [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionPlan {
    pub field: CorrectionField,
    pub old_value: Option<Timestamp>,
    pub new_value: Timestamp,
    pub next: SessionState,
    /// UTC dates that must not fall inside a locked period.
    pub affected_dates: Vec<Date>,
}

impl SessionState {
    /// A freshly opened, uncorrected session.
    pub fn open(person_id: DbId, project_id: DbId, check_in_ts: Timestamp) -> Self {
        Self {
            person_id,
            project_id,
            check_in_ts: to_storage_precision(check_in_ts),
            check_out_ts: None,
            corrected: false,
        }
    }

    /// A session built from a start/stop pair, validated against ordering.
    pub fn from_interval(
        person_id: DbId,
        project_id: DbId,
        check_in_ts: Timestamp,
        check_out_ts: Option<Timestamp>,
    ) -> Result<Self, CoreError> {
        let mut state = Self::open(person_id, project_id, check_in_ts);
        if let Some(out) = check_out_ts {
            state = state.close(out)?;
        }
        Ok(state)
    }

    pub fn is_open(&self) -> bool {
        self.check_out_ts.is_none()
    }

    /// The integrity hash this state must carry.
    pub fn fingerprint(&self) -> String {
        session_fingerprint(
            self.person_id,
            self.project_id,
            &self.check_in_ts,
            self.check_out_ts.as_ref(),
            self.corrected,
        )
    }

    /// Close the session at `at`, keeping its correction status.
    pub fn close(&self, at: Timestamp) -> Result<Self, CoreError> {
        let at = to_storage_precision(at);
        validate_interval(&self.check_in_ts, Some(&at))?;
        Ok(Self {
            check_out_ts: Some(at),
            ..self.clone()
        })
    }

    /// Plan a correction of `field` to `new_value`.
    ///
    /// Rejects a value that would break check-out ordering and a value equal
    /// to the current one.
    pub fn plan_correction(
        &self,
        field: CorrectionField,
        new_value: Timestamp,
    ) -> Result<CorrectionPlan, CoreError> {
        let new_value = to_storage_precision(new_value);
        let mut next = self.clone();
        let old_value = match field {
            CorrectionField::CheckInTs => {
                next.check_in_ts = new_value;
                Some(self.check_in_ts)
            }
            CorrectionField::CheckOutTs => {
                next.check_out_ts = Some(new_value);
                self.check_out_ts
            }
        };

        if old_value == Some(new_value) {
            return Err(CoreError::Validation(format!(
                "{field} already has the value {}",
                new_value.to_rfc3339()
            )));
        }

        validate_interval(&next.check_in_ts, next.check_out_ts.as_ref())?;
        next.corrected = true;

        let mut affected_dates = vec![new_value.date_naive()];
        if let Some(old) = old_value {
            affected_dates.push(old.date_naive());
        }
        affected_dates.sort();
        affected_dates.dedup();

        Ok(CorrectionPlan {
            field,
            old_value,
            new_value,
            next,
            affected_dates,
        })
    }

    /// Worked duration in whole minutes, if the session is closed.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.check_out_ts
            .map(|out| (out - self.check_in_ts).num_minutes())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A check-out, when present, must not precede the check-in.
pub fn validate_interval(
    check_in_ts: &Timestamp,
    check_out_ts: Option<&Timestamp>,
) -> Result<(), CoreError> {
    match check_out_ts {
        Some(out) if out < check_in_ts => Err(CoreError::Validation(format!(
            "check_out_ts ({}) must not precede check_in_ts ({})",
            out.to_rfc3339(),
            check_in_ts.to_rfc3339()
        ))),
        _ => Ok(()),
    }
}

/// `validator` hook for justification text on corrections and unlocks.
pub fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    let len = reason.trim().chars().count();
    if len < MIN_REASON_LENGTH {
        let mut err = ValidationError::new("reason_too_short");
        err.message = Some(
            format!("must be at least {MIN_REASON_LENGTH} characters (got {len})").into(),
        );
        return Err(err);
    }
    if len > MAX_REASON_LENGTH {
        let mut err = ValidationError::new("reason_too_long");
        err.message = Some(format!("must be at most {MAX_REASON_LENGTH} characters").into());
        return Err(err);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
