//! Supervisor corrections of recorded timestamps.

use serde::Serialize;
use sitelog_core::attendance::CorrectionField;
use sitelog_core::audit::{actions, entity_types};
use sitelog_core::error::CoreError;
use sitelog_core::types::{DbId, Timestamp};
use sitelog_db::models::attendance_session::AttendanceSession;
use sitelog_db::models::correction::{CorrectionLogEntry, CreateCorrection};
use sitelog_db::repositories::{AttendanceSessionRepo, CorrectionLogRepo, PeriodLockRepo};
use sitelog_events::AuditEvent;

use super::check_reason;
use crate::error::AppResult;
use crate::middleware::auth::OrgMember;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct Correction {
    pub session_id: DbId,
    pub field: CorrectionField,
    pub new_value: Timestamp,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectionOutcome {
    pub session: AttendanceSession,
    pub correction: CorrectionLogEntry,
}

/// Apply one correction and append its log entry in a single transaction.
///
/// Refused with `Conflict` if an active period lock on the session's project
/// covers the UTC date of either the current or the new value. Not
/// idempotent: every call is a separate, separately justified edit.
pub async fn correct(
    state: &AppState,
    actor: &OrgMember,
    cmd: &Correction,
) -> AppResult<CorrectionOutcome> {
    check_reason(&cmd.reason)?;

    let mut tx = state.pool.begin().await?;

    let before =
        AttendanceSessionRepo::find_by_id_for_update(&mut *tx, actor.org_id, cmd.session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "AttendanceSession",
                id: cmd.session_id,
            })?;

    let plan = before.state().plan_correction(cmd.field, cmd.new_value)?;

    if let Some(lock) = PeriodLockRepo::find_covering(
        &mut *tx,
        actor.org_id,
        before.project_id,
        &plan.affected_dates,
    )
    .await?
    {
        tracing::warn!(
            session_id = before.id,
            org_id = actor.org_id,
            project_id = before.project_id,
            lock_id = lock.id,
            period = %lock.range(),
            "Correction refused, period is locked"
        );
        return Err(CoreError::Conflict(format!(
            "Period {} is locked for project {}",
            lock.range(),
            before.project_id
        ))
        .into());
    }

    let session = AttendanceSessionRepo::apply_correction(
        &mut *tx,
        before.id,
        plan.next.check_in_ts,
        plan.next.check_out_ts,
        &plan.next.fingerprint(),
    )
    .await?;

    let correction = CorrectionLogRepo::insert(
        &mut *tx,
        &CreateCorrection {
            org_id: actor.org_id,
            session_id: before.id,
            field: plan.field,
            old_value: plan.old_value,
            new_value: plan.new_value,
            reason: cmd.reason.trim().to_string(),
            changed_by: actor.person_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        session_id = session.id,
        correction_id = correction.id,
        org_id = actor.org_id,
        field = %plan.field,
        actor_id = actor.person_id,
        "Session corrected"
    );
    state.audit_bus.publish(
        AuditEvent::new(actor.org_id, actions::CORRECT, entity_types::ATTENDANCE_SESSION)
            .with_entity(session.id)
            .with_actor(actor.person_id)
            .with_before(&before)
            .with_after(&serde_json::json!({
                "session": &session,
                "correction": &correction,
            })),
    );

    Ok(CorrectionOutcome {
        session,
        correction,
    })
}
