//! Repository for `attendance_review_flags`.

use sitelog_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::review_flag::{CreateReviewFlag, ReviewFlag};

const COLUMNS: &str = "id, org_id, project_id, person_id, time_entry_id, \
    existing_session_id, reason, resolved, created_at";

pub struct ReviewFlagRepo;

impl ReviewFlagRepo {
    /// Raise a flag for a time entry. Returns `None` if it is already flagged.
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        input: &CreateReviewFlag,
    ) -> Result<Option<ReviewFlag>, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance_review_flags
                (org_id, project_id, person_id, time_entry_id, existing_session_id, reason)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (time_entry_id) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReviewFlag>(&query)
            .bind(input.org_id)
            .bind(input.project_id)
            .bind(input.person_id)
            .bind(input.time_entry_id)
            .bind(input.existing_session_id)
            .bind(&input.reason)
            .fetch_optional(conn)
            .await
    }

    /// List unresolved flags for an organisation, newest first.
    pub async fn list_unresolved(
        pool: &PgPool,
        org_id: DbId,
        project_id: Option<DbId>,
    ) -> Result<Vec<ReviewFlag>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_review_flags
             WHERE org_id = $1 AND NOT resolved
               AND ($2::bigint IS NULL OR project_id = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ReviewFlag>(&query)
            .bind(org_id)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
