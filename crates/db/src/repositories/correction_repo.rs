//! Repository for the append-only `attendance_corrections` table.

use sitelog_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::correction::{CorrectionLogEntry, CreateCorrection};

const COLUMNS: &str = "id, org_id, session_id, field, old_value, new_value, \
    reason, changed_by, created_at";

pub struct CorrectionLogRepo;

impl CorrectionLogRepo {
    /// Append one entry. Call inside the transaction that updates the session.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &CreateCorrection,
    ) -> Result<CorrectionLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance_corrections
                (org_id, session_id, field, old_value, new_value, reason, changed_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CorrectionLogEntry>(&query)
            .bind(input.org_id)
            .bind(input.session_id)
            .bind(input.field.as_str())
            .bind(input.old_value)
            .bind(input.new_value)
            .bind(&input.reason)
            .bind(input.changed_by)
            .fetch_one(conn)
            .await
    }

    /// List a session's corrections, oldest first.
    pub async fn list_by_session(
        pool: &PgPool,
        org_id: DbId,
        session_id: DbId,
    ) -> Result<Vec<CorrectionLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_corrections
             WHERE org_id = $1 AND session_id = $2
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, CorrectionLogEntry>(&query)
            .bind(org_id)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_session(
        pool: &PgPool,
        org_id: DbId,
        session_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM attendance_corrections WHERE org_id = $1 AND session_id = $2",
        )
        .bind(org_id)
        .bind(session_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
