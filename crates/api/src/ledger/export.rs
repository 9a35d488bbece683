//! Compliance export of a project's sessions over a date range.

use chrono::Utc;
use sitelog_core::audit::{actions, entity_types};
use sitelog_core::export::{render, ExportDocument, ExportQuery, ExportRow};
use sitelog_core::types::to_storage_precision;
use sitelog_db::repositories::{AttendanceSessionRepo, PeriodLockRepo};
use sitelog_events::AuditEvent;

use super::load_project;
use crate::error::AppResult;
use crate::middleware::auth::OrgMember;
use crate::state::AppState;

/// Render an export document. Read-only apart from the audit event.
///
/// The lock status of the range is reported in the trailer for information
/// and has no effect on what is exported.
pub async fn export(
    state: &AppState,
    actor: &OrgMember,
    query: &ExportQuery,
) -> AppResult<ExportDocument> {
    load_project(&state.pool, query.org_id, query.project_id).await?;

    let (from, to) = query.range.timestamp_bounds();
    let sessions = AttendanceSessionRepo::list_by_project_range(
        &state.pool,
        query.org_id,
        query.project_id,
        from,
        to,
    )
    .await?;
    let period_locked =
        PeriodLockRepo::overlaps_range(&state.pool, query.org_id, query.project_id, &query.range)
            .await?;

    let rows: Vec<ExportRow> = sessions
        .into_iter()
        .map(|s| ExportRow {
            session_id: s.id,
            person_id: s.person_id,
            check_in_ts: s.check_in_ts,
            check_out_ts: s.check_out_ts,
            source: s.source,
            corrected: s.corrected,
            integrity_hash: s.integrity_hash,
        })
        .collect();

    let exported_at = to_storage_precision(Utc::now());
    let document = render(query, &rows, exported_at, period_locked);

    tracing::info!(
        org_id = query.org_id,
        project_id = query.project_id,
        period = %query.range,
        format = %query.format,
        row_count = document.row_count,
        period_locked,
        content_fingerprint = %document.content_fingerprint,
        actor_id = actor.person_id,
        "Compliance export generated"
    );
    state.audit_bus.publish(
        AuditEvent::new(query.org_id, actions::EXPORT, entity_types::PROJECT)
            .with_entity(query.project_id)
            .with_actor(actor.person_id)
            .with_after(&serde_json::json!({
                "period": query.range,
                "format": query.format,
                "row_count": document.row_count,
                "period_locked": period_locked,
                "exported_at": exported_at,
                "content_fingerprint": &document.content_fingerprint,
                "document_fingerprint": &document.document_fingerprint,
            })),
    );

    Ok(document)
}
