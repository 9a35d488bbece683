//! Check-in, check-out and session reads.

use serde::Serialize;
use sitelog_core::attendance::{SessionSource, SessionState};
use sitelog_core::audit::{actions, entity_types};
use sitelog_core::error::CoreError;
use sitelog_core::period::PeriodRange;
use sitelog_core::roles::ROLE_SUPERVISOR;
use sitelog_core::types::{DbId, Timestamp};
use sitelog_db::models::attendance_session::{AttendanceSession, CreateAttendanceSession};
use sitelog_db::models::correction::CorrectionLogEntry;
use sitelog_db::repositories::{AttendanceSessionRepo, CorrectionLogRepo, DirectoryRepo};
use sitelog_events::AuditEvent;

use super::load_project;
use crate::error::AppResult;
use crate::middleware::auth::OrgMember;
use crate::state::AppState;

/// Insert attempts before giving up on a session that keeps closing
/// between the conflicting insert and the follow-up read.
const OPEN_SESSION_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Commands and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CheckIn {
    pub project_id: DbId,
    pub person_id: DbId,
    pub at: Timestamp,
    pub source: SessionSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInOutcome {
    pub session: AttendanceSession,
    /// `true` if an open session already existed and nothing was created.
    pub already_open: bool,
}

#[derive(Debug, Clone)]
pub struct CheckOut {
    pub project_id: DbId,
    pub person_id: DbId,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutOutcome {
    /// The session that was closed, or the most recently closed one if there
    /// was nothing to close. `None` if the person never checked in.
    pub session: Option<AttendanceSession>,
    pub already_closed: bool,
}

/// Result of recomputing a session's fingerprint.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub session_id: DbId,
    pub stored_hash: String,
    pub computed_hash: String,
    pub valid: bool,
}

// ---------------------------------------------------------------------------
// Authorization helpers
// ---------------------------------------------------------------------------

/// Workers may only record their own attendance; supervisors and above may
/// record anyone's. The subject must be an active member of the org.
async fn authorize_subject(state: &AppState, actor: &OrgMember, person_id: DbId) -> AppResult<()> {
    if person_id != actor.person_id && !actor.has_role(ROLE_SUPERVISOR) {
        return Err(CoreError::Forbidden(
            "Only supervisors may record attendance for another person".into(),
        )
        .into());
    }

    let membership = DirectoryRepo::find_membership(&state.pool, actor.org_id, person_id).await?;
    match membership {
        Some(m) if m.is_active => Ok(()),
        _ => Err(CoreError::Forbidden(format!(
            "Person {person_id} has no active membership in this organization"
        ))
        .into()),
    }
}

// ---------------------------------------------------------------------------
// Check-in
// ---------------------------------------------------------------------------

/// Open a session, or report the one already open for this key.
///
/// Safe to retry: the open-session unique index arbitrates concurrent
/// duplicates, and the losing insert resolves to the existing session.
pub async fn check_in(
    state: &AppState,
    actor: &OrgMember,
    cmd: &CheckIn,
) -> AppResult<CheckInOutcome> {
    if cmd.source != SessionSource::QrScan {
        return Err(CoreError::Validation(format!(
            "source '{}' cannot be used for a direct check-in",
            cmd.source
        ))
        .into());
    }

    let project = load_project(&state.pool, actor.org_id, cmd.project_id).await?;
    if !project.attendance_enabled {
        return Err(CoreError::Validation(format!(
            "Attendance tracking is not enabled for project {}",
            project.id
        ))
        .into());
    }
    authorize_subject(state, actor, cmd.person_id).await?;

    let input = CreateAttendanceSession {
        org_id: actor.org_id,
        state: SessionState::open(cmd.person_id, cmd.project_id, cmd.at),
        source: cmd.source,
        time_entry_id: None,
    };

    let mut conn = state.pool.acquire().await?;
    for _ in 0..OPEN_SESSION_ATTEMPTS {
        if let Some(session) = AttendanceSessionRepo::insert(&mut *conn, &input).await? {
            tracing::info!(
                session_id = session.id,
                org_id = session.org_id,
                project_id = session.project_id,
                person_id = session.person_id,
                actor_id = actor.person_id,
                "Checked in"
            );
            state.audit_bus.publish(
                AuditEvent::new(actor.org_id, actions::CHECK_IN, entity_types::ATTENDANCE_SESSION)
                    .with_entity(session.id)
                    .with_actor(actor.person_id)
                    .with_after(&session),
            );
            return Ok(CheckInOutcome {
                session,
                already_open: false,
            });
        }

        if let Some(session) = AttendanceSessionRepo::find_open(
            &mut *conn,
            actor.org_id,
            cmd.project_id,
            cmd.person_id,
        )
        .await?
        {
            tracing::debug!(
                session_id = session.id,
                person_id = session.person_id,
                "Check-in ignored, session already open"
            );
            return Ok(CheckInOutcome {
                session,
                already_open: true,
            });
        }
    }

    Err(CoreError::Conflict(
        "Open session changed concurrently; retry the check-in".into(),
    )
    .into())
}

// ---------------------------------------------------------------------------
// Check-out
// ---------------------------------------------------------------------------

/// Close the most recent open session for the key.
///
/// Nothing to close is a successful no-op reporting `already_closed`.
pub async fn check_out(
    state: &AppState,
    actor: &OrgMember,
    cmd: &CheckOut,
) -> AppResult<CheckOutOutcome> {
    load_project(&state.pool, actor.org_id, cmd.project_id).await?;
    authorize_subject(state, actor, cmd.person_id).await?;

    let mut tx = state.pool.begin().await?;

    let open = AttendanceSessionRepo::find_open_for_update(
        &mut *tx,
        actor.org_id,
        cmd.project_id,
        cmd.person_id,
    )
    .await?;

    let Some(open) = open else {
        let latest = AttendanceSessionRepo::find_latest_closed(
            &mut *tx,
            actor.org_id,
            cmd.project_id,
            cmd.person_id,
        )
        .await?;
        tx.commit().await?;
        tracing::debug!(
            org_id = actor.org_id,
            project_id = cmd.project_id,
            person_id = cmd.person_id,
            "Check-out ignored, no open session"
        );
        return Ok(CheckOutOutcome {
            session: latest,
            already_closed: true,
        });
    };

    let next = open.state().close(cmd.at)?;
    let closed = AttendanceSessionRepo::close(
        &mut *tx,
        open.id,
        next.check_out_ts.unwrap_or(cmd.at),
        &next.fingerprint(),
    )
    .await?
    .ok_or_else(|| CoreError::Internal(format!("Session {} vanished while locked", open.id)))?;
    tx.commit().await?;

    tracing::info!(
        session_id = closed.id,
        org_id = closed.org_id,
        project_id = closed.project_id,
        person_id = closed.person_id,
        actor_id = actor.person_id,
        duration_minutes = ?closed.state().duration_minutes(),
        "Checked out"
    );
    state.audit_bus.publish(
        AuditEvent::new(actor.org_id, actions::CHECK_OUT, entity_types::ATTENDANCE_SESSION)
            .with_entity(closed.id)
            .with_actor(actor.person_id)
            .with_before(&open)
            .with_after(&closed),
    );

    Ok(CheckOutOutcome {
        session: Some(closed),
        already_closed: false,
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub async fn get_session(
    state: &AppState,
    actor: &OrgMember,
    session_id: DbId,
) -> AppResult<AttendanceSession> {
    AttendanceSessionRepo::find_by_id(&state.pool, actor.org_id, session_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "AttendanceSession",
                id: session_id,
            }
            .into()
        })
}

/// Sessions of a project whose check-in falls on a date in `range`.
pub async fn list_sessions(
    state: &AppState,
    actor: &OrgMember,
    project_id: DbId,
    range: &PeriodRange,
) -> AppResult<Vec<AttendanceSession>> {
    load_project(&state.pool, actor.org_id, project_id).await?;
    let (from, to) = range.timestamp_bounds();
    let sessions =
        AttendanceSessionRepo::list_by_project_range(&state.pool, actor.org_id, project_id, from, to)
            .await?;
    Ok(sessions)
}

pub async fn list_corrections(
    state: &AppState,
    actor: &OrgMember,
    session_id: DbId,
) -> AppResult<Vec<CorrectionLogEntry>> {
    let session = get_session(state, actor, session_id).await?;
    let entries = CorrectionLogRepo::list_by_session(&state.pool, actor.org_id, session.id).await?;
    Ok(entries)
}

/// Recompute a session's fingerprint and compare it with the stored one.
pub async fn verify_session(
    state: &AppState,
    actor: &OrgMember,
    session_id: DbId,
) -> AppResult<IntegrityReport> {
    let session = get_session(state, actor, session_id).await?;
    let computed_hash = session.state().fingerprint();
    let valid = computed_hash == session.integrity_hash;
    if !valid {
        tracing::warn!(
            session_id = session.id,
            org_id = session.org_id,
            "Attendance session fingerprint mismatch"
        );
    }
    Ok(IntegrityReport {
        session_id: session.id,
        stored_hash: session.integrity_hash,
        computed_hash,
        valid,
    })
}
