//! Session reconciliation: materialise raw time entries as ledger sessions.
//!
//! Each entry becomes at most one session, linked through `time_entry_id`.
//! An entry that already has a session is skipped, whatever later happened
//! to that session (a correction, a check-out), which makes repeated runs
//! over overlapping windows safe. The one exception is an entry that was
//! materialised while still running and has since been stopped: its open,
//! uncorrected session is closed. Entries whose fingerprint matches a
//! session already in the ledger are skipped as well. An entry without a
//! stop time that meets an already-open session for the same person and
//! project is not inserted; it is flagged for review.
//!
//! The run holds a transaction-scoped advisory lock so two runs never
//! interleave, and each entry is processed under its own savepoint.

use serde::Serialize;
use sitelog_core::attendance::{SessionSource, SessionState};
use sitelog_core::error::CoreError;
use sitelog_core::types::{DbId, Timestamp};
use sitelog_db::models::attendance_session::CreateAttendanceSession;
use sitelog_db::models::review_flag::CreateReviewFlag;
use sitelog_db::models::time_entry::TimeEntry;
use sitelog_db::repositories::{AttendanceSessionRepo, ReviewFlagRepo, TimeEntryRepo};
use sqlx::{Acquire, PgConnection, PgPool};

/// Advisory lock key held for the duration of a run ("sitelog" in ASCII).
const RECONCILE_LOCK_KEY: i64 = 0x0073_6974_656c_6f67;

/// Reason recorded on review flags raised for open-session collisions.
const COLLISION_REASON: &str = "open_session_exists";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which time entries a run covers.
#[derive(Debug, Clone)]
pub struct ReconcileScope {
    /// Restrict to one organisation; `None` covers all of them.
    pub org_id: Option<DbId>,
    /// Inclusive lower bound on `started_at` or `stopped_at`.
    pub from: Timestamp,
    /// Exclusive upper bound on `started_at` or `stopped_at`.
    pub to: Timestamp,
}

/// A time entry that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub time_entry_id: DbId,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationSummary {
    pub processed: u64,
    pub created: u64,
    /// Open reconciled sessions closed because their entry has since stopped.
    pub closed: u64,
    pub skipped_duplicates: u64,
    pub flagged_collisions: u64,
    pub errors: Vec<RowError>,
}

/// What happened to a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Created,
    Closed,
    Duplicate,
    Flagged,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Reconcile every time entry in `scope`.
///
/// Fails as a whole only if the window is invalid, another run holds the
/// lock, or the database is unavailable. Per-entry failures are collected in
/// [`ReconciliationSummary::errors`].
pub async fn run(
    pool: &PgPool,
    scope: &ReconcileScope,
) -> Result<ReconciliationSummary, ReconcileError> {
    if scope.to <= scope.from {
        return Err(CoreError::Validation(format!(
            "reconciliation window is empty: from {} to {}",
            scope.from.to_rfc3339(),
            scope.to.to_rfc3339()
        ))
        .into());
    }

    let mut tx = pool.begin().await?;

    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
        .bind(RECONCILE_LOCK_KEY)
        .fetch_one(&mut *tx)
        .await?;
    if !acquired {
        return Err(
            CoreError::Conflict("a reconciliation run is already in progress".into()).into(),
        );
    }

    let entries = TimeEntryRepo::list_window(&mut *tx, scope.org_id, scope.from, scope.to).await?;
    let mut summary = ReconciliationSummary::default();

    for entry in &entries {
        summary.processed += 1;

        let mut savepoint = (&mut *tx).begin().await?;
        match reconcile_entry(&mut *savepoint, entry).await {
            Ok(outcome) => {
                savepoint.commit().await?;
                match outcome {
                    RowOutcome::Created => summary.created += 1,
                    RowOutcome::Closed => summary.closed += 1,
                    RowOutcome::Duplicate => summary.skipped_duplicates += 1,
                    RowOutcome::Flagged => summary.flagged_collisions += 1,
                }
            }
            Err(e) => {
                savepoint.rollback().await?;
                tracing::warn!(
                    time_entry_id = entry.id,
                    org_id = entry.org_id,
                    error = %e,
                    "Reconciliation skipped time entry"
                );
                summary.errors.push(RowError {
                    time_entry_id: entry.id,
                    message: e.to_string(),
                });
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        org_id = ?scope.org_id,
        from = %scope.from,
        to = %scope.to,
        processed = summary.processed,
        created = summary.created,
        closed = summary.closed,
        skipped_duplicates = summary.skipped_duplicates,
        flagged_collisions = summary.flagged_collisions,
        errors = summary.errors.len(),
        "Reconciliation run finished"
    );

    Ok(summary)
}

async fn reconcile_entry(
    conn: &mut PgConnection,
    entry: &TimeEntry,
) -> Result<RowOutcome, ReconcileError> {
    let state = SessionState::from_interval(
        entry.person_id,
        entry.project_id,
        entry.started_at,
        entry.stopped_at,
    )?;

    if let Some(existing) =
        AttendanceSessionRepo::find_by_time_entry(conn, entry.org_id, entry.id).await?
    {
        // Materialised while still running and stopped since.
        if let (None, Some(stopped_at)) = (existing.check_out_ts, entry.stopped_at) {
            if !existing.corrected {
                let closed = existing.state().close(stopped_at)?;
                if AttendanceSessionRepo::close(
                    conn,
                    existing.id,
                    stopped_at,
                    &closed.fingerprint(),
                )
                .await?
                .is_some()
                {
                    tracing::debug!(
                        session_id = existing.id,
                        time_entry_id = entry.id,
                        "Closed reconciled session"
                    );
                    return Ok(RowOutcome::Closed);
                }
            }
        }
        return Ok(RowOutcome::Duplicate);
    }

    if AttendanceSessionRepo::exists_with_hash(conn, entry.org_id, &state.fingerprint()).await? {
        return Ok(RowOutcome::Duplicate);
    }

    let input = CreateAttendanceSession {
        org_id: entry.org_id,
        state,
        source: SessionSource::TimeEntryReconciled,
        time_entry_id: Some(entry.id),
    };

    match AttendanceSessionRepo::insert(conn, &input).await? {
        Some(session) => {
            tracing::debug!(
                session_id = session.id,
                time_entry_id = entry.id,
                org_id = entry.org_id,
                "Materialised time entry"
            );
            Ok(RowOutcome::Created)
        }
        None => {
            let existing_session_id = AttendanceSessionRepo::find_open(
                conn,
                entry.org_id,
                entry.project_id,
                entry.person_id,
            )
            .await?
            .map(|s| s.id);
            ReviewFlagRepo::insert_if_absent(
                conn,
                &CreateReviewFlag {
                    org_id: entry.org_id,
                    project_id: entry.project_id,
                    person_id: entry.person_id,
                    time_entry_id: entry.id,
                    existing_session_id,
                    reason: COLLISION_REASON.to_string(),
                },
            )
            .await?;
            tracing::info!(
                time_entry_id = entry.id,
                existing_session_id = ?existing_session_id,
                org_id = entry.org_id,
                "Open-session collision flagged for review"
            );
            Ok(RowOutcome::Flagged)
        }
    }
}
