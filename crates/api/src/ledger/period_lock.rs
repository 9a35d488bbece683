//! Period lock manager: freeze and release invoicing windows.

use sitelog_core::audit::{actions, entity_types};
use sitelog_core::error::CoreError;
use sitelog_core::period::PeriodRange;
use sitelog_core::types::{Date, DbId};
use sitelog_db::models::period_lock::{CreatePeriodLock, PeriodLock};
use sitelog_db::repositories::PeriodLockRepo;
use sitelog_events::AuditEvent;

use super::{check_reason, load_project};
use crate::error::AppResult;
use crate::middleware::auth::OrgMember;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct LockPeriod {
    pub project_id: DbId,
    pub range: PeriodRange,
    pub reason: Option<String>,
    /// Fingerprint of the billing artifact computed over this range.
    pub hash_signature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UnlockPeriod {
    pub project_id: DbId,
    pub range: PeriodRange,
    pub reason: String,
}

/// Lock a range. `Conflict` if an active lock for the identical range exists.
pub async fn lock(state: &AppState, actor: &OrgMember, cmd: &LockPeriod) -> AppResult<PeriodLock> {
    load_project(&state.pool, actor.org_id, cmd.project_id).await?;

    let input = CreatePeriodLock {
        org_id: actor.org_id,
        project_id: cmd.project_id,
        range: cmd.range,
        locked_by: actor.person_id,
        reason: cmd
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        hash_signature: cmd.hash_signature.clone(),
    };

    let mut conn = state.pool.acquire().await?;
    let lock = PeriodLockRepo::lock(&mut *conn, &input)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!(
                "Period {} is already locked for project {}",
                cmd.range, cmd.project_id
            ))
        })?;

    tracing::info!(
        lock_id = lock.id,
        org_id = actor.org_id,
        project_id = lock.project_id,
        period = %lock.range(),
        actor_id = actor.person_id,
        "Period locked"
    );
    state.audit_bus.publish(
        AuditEvent::new(actor.org_id, actions::PERIOD_LOCK, entity_types::PERIOD_LOCK)
            .with_entity(lock.id)
            .with_actor(actor.person_id)
            .with_after(&lock),
    );

    Ok(lock)
}

/// Release the active lock for exactly this range.
///
/// Does not touch attendance data; the range is simply no longer frozen.
pub async fn unlock(
    state: &AppState,
    actor: &OrgMember,
    cmd: &UnlockPeriod,
) -> AppResult<PeriodLock> {
    check_reason(&cmd.reason)?;
    load_project(&state.pool, actor.org_id, cmd.project_id).await?;

    let mut tx = state.pool.begin().await?;

    let before =
        PeriodLockRepo::find_active_for_update(&mut *tx, actor.org_id, cmd.project_id, &cmd.range)
            .await?
            .ok_or_else(|| CoreError::NotFoundWhere {
                entity: "PeriodLock",
                detail: format!("active lock on {} for project {}", cmd.range, cmd.project_id),
            })?;

    let after = PeriodLockRepo::release(&mut *tx, before.id, cmd.reason.trim()).await?;
    tx.commit().await?;

    tracing::info!(
        lock_id = after.id,
        org_id = actor.org_id,
        project_id = after.project_id,
        period = %after.range(),
        actor_id = actor.person_id,
        "Period unlocked"
    );
    state.audit_bus.publish(
        AuditEvent::new(actor.org_id, actions::PERIOD_UNLOCK, entity_types::PERIOD_LOCK)
            .with_entity(after.id)
            .with_actor(actor.person_id)
            .with_before(&before)
            .with_after(&after),
    );

    Ok(after)
}

/// Whether any active lock on the project contains `date`.
pub async fn is_locked(
    state: &AppState,
    actor: &OrgMember,
    project_id: DbId,
    date: Date,
) -> AppResult<bool> {
    load_project(&state.pool, actor.org_id, project_id).await?;
    Ok(PeriodLockRepo::is_locked(&state.pool, actor.org_id, project_id, date).await?)
}

pub async fn list(
    state: &AppState,
    actor: &OrgMember,
    project_id: DbId,
    active_only: bool,
) -> AppResult<Vec<PeriodLock>> {
    load_project(&state.pool, actor.org_id, project_id).await?;
    Ok(PeriodLockRepo::list_by_project(&state.pool, actor.org_id, project_id, active_only).await?)
}
