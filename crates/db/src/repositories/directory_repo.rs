//! Lookups against the tenant directory (projects and memberships).

use sitelog_core::types::DbId;
use sqlx::PgPool;

use crate::models::directory::{OrgMember, Project};

pub struct DirectoryRepo;

impl DirectoryRepo {
    /// Find a project by id, scoped to its organisation.
    pub async fn find_project(
        pool: &PgPool,
        org_id: DbId,
        project_id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            "SELECT id, org_id, name, attendance_enabled
             FROM projects
             WHERE id = $1 AND org_id = $2",
        )
        .bind(project_id)
        .bind(org_id)
        .fetch_optional(pool)
        .await
    }

    /// Find a person's membership row in an organisation, active or not.
    pub async fn find_membership(
        pool: &PgPool,
        org_id: DbId,
        person_id: DbId,
    ) -> Result<Option<OrgMember>, sqlx::Error> {
        sqlx::query_as::<_, OrgMember>(
            "SELECT id, org_id, person_id, role, is_active
             FROM org_members
             WHERE org_id = $1 AND person_id = $2",
        )
        .bind(org_id)
        .bind(person_id)
        .fetch_optional(pool)
        .await
    }
}
