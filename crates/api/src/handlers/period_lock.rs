//! Handlers for period locks.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sitelog_core::attendance::validate_reason;
use sitelog_core::period::PeriodRange;
use sitelog_core::types::{Date, DbId};
use validator::Validate;

use crate::error::AppResult;
use crate::ledger::period_lock::{self, LockPeriod, UnlockPeriod};
use crate::middleware::rbac::{RequireAdmin, RequireMember, RequireOwner};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LockRequest {
    pub project_id: DbId,
    pub period_start: Date,
    pub period_end: Date,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub hash_signature: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UnlockRequest {
    pub project_id: DbId,
    pub period_start: Date,
    pub period_end: Date,
    #[validate(custom(function = "validate_reason"))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ListLocksQuery {
    pub project_id: DbId,
    /// Only return currently active locks (default: false).
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LockStatusQuery {
    pub project_id: DbId,
    pub date: Date,
}

#[derive(Debug, Serialize)]
pub struct LockStatus {
    pub project_id: DbId,
    pub date: Date,
    pub locked: bool,
}

/// POST /period-locks/lock
///
/// Admin or above. 409 if the identical range is already locked.
pub async fn lock(
    State(state): State<AppState>,
    RequireAdmin(member): RequireAdmin,
    Json(input): Json<LockRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let cmd = LockPeriod {
        project_id: input.project_id,
        range: PeriodRange::new(input.period_start, input.period_end)?,
        reason: input.reason,
        hash_signature: input.hash_signature,
    };
    let lock = period_lock::lock(&state, &member, &cmd).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: lock })))
}

/// POST /period-locks/unlock
///
/// Owner only. 404 if no active lock matches the range exactly.
pub async fn unlock(
    State(state): State<AppState>,
    RequireOwner(member): RequireOwner,
    Json(input): Json<UnlockRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let cmd = UnlockPeriod {
        project_id: input.project_id,
        range: PeriodRange::new(input.period_start, input.period_end)?,
        reason: input.reason,
    };
    let lock = period_lock::unlock(&state, &member, &cmd).await?;
    Ok(Json(DataResponse { data: lock }))
}

/// GET /period-locks?project_id&active
pub async fn list_locks(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Query(params): Query<ListLocksQuery>,
) -> AppResult<impl IntoResponse> {
    let locks = period_lock::list(
        &state,
        &member,
        params.project_id,
        params.active.unwrap_or(false),
    )
    .await?;
    Ok(Json(DataResponse { data: locks }))
}

/// GET /period-locks/status?project_id&date
pub async fn lock_status(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Query(params): Query<LockStatusQuery>,
) -> AppResult<impl IntoResponse> {
    let locked = period_lock::is_locked(&state, &member, params.project_id, params.date).await?;
    Ok(Json(DataResponse {
        data: LockStatus {
            project_id: params.project_id,
            date: params.date,
            locked,
        },
    }))
}
