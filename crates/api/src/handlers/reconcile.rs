//! Handlers for on-demand reconciliation and its review flags.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use sitelog_core::audit::{actions, entity_types};
use sitelog_core::error::CoreError;
use sitelog_core::period::MAX_QUERY_RANGE_DAYS;
use sitelog_core::types::{DbId, Timestamp};
use sitelog_db::repositories::ReviewFlagRepo;
use sitelog_events::AuditEvent;
use sitelog_worker::reconcile::{self, ReconcileScope};

use crate::error::AppResult;
use crate::middleware::rbac::RequireSupervisor;
use crate::response::DataResponse;
use crate::state::AppState;

/// Half-open window `[from, to)` over time entry start times.
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub from: Timestamp,
    pub to: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct ReviewFlagsQuery {
    pub project_id: Option<DbId>,
}

/// POST /attendance/reconcile
///
/// Supervisor or above. Reconciles the caller's organisation only.
pub async fn run_reconciliation(
    State(state): State<AppState>,
    RequireSupervisor(member): RequireSupervisor,
    Json(input): Json<ReconcileRequest>,
) -> AppResult<impl IntoResponse> {
    if (input.to - input.from).num_days() > MAX_QUERY_RANGE_DAYS {
        return Err(CoreError::Validation(format!(
            "Reconciliation window may span at most {MAX_QUERY_RANGE_DAYS} days"
        ))
        .into());
    }

    let scope = ReconcileScope {
        org_id: Some(member.org_id),
        from: input.from,
        to: input.to,
    };
    let summary = reconcile::run(&state.pool, &scope).await?;

    state.audit_bus.publish(
        AuditEvent::new(member.org_id, actions::RECONCILE, entity_types::ATTENDANCE_SESSION)
            .with_actor(member.person_id)
            .with_after(&serde_json::json!({
                "from": input.from,
                "to": input.to,
                "summary": &summary,
            })),
    );

    Ok(Json(DataResponse { data: summary }))
}

/// GET /attendance/review-flags?project_id
pub async fn list_review_flags(
    State(state): State<AppState>,
    RequireSupervisor(member): RequireSupervisor,
    Query(params): Query<ReviewFlagsQuery>,
) -> AppResult<impl IntoResponse> {
    let flags =
        ReviewFlagRepo::list_unresolved(&state.pool, member.org_id, params.project_id).await?;
    Ok(Json(DataResponse { data: flags }))
}
