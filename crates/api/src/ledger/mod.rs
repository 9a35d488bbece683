//! Ledger services: the transactional orchestration behind each endpoint.
//!
//! Handlers parse and validate requests, then call into these functions with
//! the caller's verified [`OrgMember`](crate::middleware::auth::OrgMember).
//! Every query is scoped by the member's `org_id`. Audit events are
//! published only after the ledger transaction commits.

pub mod attendance;
pub mod correction;
pub mod export;
pub mod period_lock;

use sitelog_core::attendance::validate_reason;
use sitelog_core::error::CoreError;
use sitelog_core::types::DbId;
use sitelog_db::models::directory::Project;
use sitelog_db::repositories::DirectoryRepo;
use sqlx::PgPool;

use crate::error::AppResult;

/// Load a project of the caller's organisation.
pub(crate) async fn load_project(
    pool: &PgPool,
    org_id: DbId,
    project_id: DbId,
) -> AppResult<Project> {
    DirectoryRepo::find_project(pool, org_id, project_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Project",
                id: project_id,
            }
            .into()
        })
}

/// Check justification text for corrections and unlocks.
pub(crate) fn check_reason(reason: &str) -> Result<(), CoreError> {
    validate_reason(reason).map_err(|e| {
        CoreError::Validation(format!(
            "reason: {}",
            e.message.as_deref().unwrap_or(e.code.as_ref())
        ))
    })
}
