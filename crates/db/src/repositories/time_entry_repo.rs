//! Read access to raw time entries for reconciliation.

use sitelog_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::time_entry::TimeEntry;

pub struct TimeEntryRepo;

impl TimeEntryRepo {
    /// List entries started or stopped in `[from, to)`, optionally for one
    /// organisation, plus stopped entries whose reconciled session is still
    /// open however long ago they were stopped.
    ///
    /// Oldest first so that a backfill replays history in order.
    pub async fn list_window(
        conn: &mut PgConnection,
        org_id: Option<DbId>,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<TimeEntry>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(
            "SELECT id, org_id, project_id, person_id, started_at, stopped_at
             FROM time_entries
             WHERE ($1::bigint IS NULL OR org_id = $1)
               AND (
                    (started_at >= $2 AND started_at < $3)
                 OR (stopped_at >= $2 AND stopped_at < $3)
                 OR (stopped_at IS NOT NULL AND EXISTS (
                        SELECT 1 FROM attendance_sessions s
                        WHERE s.time_entry_id = time_entries.id
                          AND s.check_out_ts IS NULL
                    ))
               )
             ORDER BY started_at ASC, id ASC",
        )
        .bind(org_id)
        .bind(from)
        .bind(to)
        .fetch_all(conn)
        .await
    }
}
