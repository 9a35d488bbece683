//! Repository for the `attendance_sessions` table.

use sitelog_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::attendance_session::{AttendanceSession, CreateAttendanceSession};

/// Column list for `attendance_sessions` queries.
const COLUMNS: &str = "id, org_id, project_id, person_id, check_in_ts, check_out_ts, \
    source, corrected, integrity_hash, time_entry_id, created_at, updated_at";

/// Provides ledger queries for attendance sessions. Rows are never deleted.
pub struct AttendanceSessionRepo;

impl AttendanceSessionRepo {
    /// Insert a session unless it would be a second open session for its key.
    ///
    /// The open-session partial unique index is the arbiter: a conflicting
    /// insert does nothing and returns `None`. Closed sessions never conflict.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &CreateAttendanceSession,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance_sessions
                (org_id, project_id, person_id, check_in_ts, check_out_ts,
                 source, corrected, integrity_hash, time_entry_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (org_id, project_id, person_id) WHERE check_out_ts IS NULL
             DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(input.org_id)
            .bind(input.state.project_id)
            .bind(input.state.person_id)
            .bind(input.state.check_in_ts)
            .bind(input.state.check_out_ts)
            .bind(input.source.as_str())
            .bind(input.state.corrected)
            .bind(input.state.fingerprint())
            .bind(input.time_entry_id)
            .fetch_optional(conn)
            .await
    }

    /// Find a session by id within an organisation.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM attendance_sessions WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Find and row-lock a session by id within an organisation.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_sessions
             WHERE id = $1 AND org_id = $2
             FOR UPDATE"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(conn)
            .await
    }

    /// Find the session materialised from a time entry, if any.
    pub async fn find_by_time_entry(
        conn: &mut PgConnection,
        org_id: DbId,
        time_entry_id: DbId,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_sessions
             WHERE org_id = $1 AND time_entry_id = $2"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(org_id)
            .bind(time_entry_id)
            .fetch_optional(conn)
            .await
    }

    /// Find the open session for a key, without locking.
    pub async fn find_open(
        conn: &mut PgConnection,
        org_id: DbId,
        project_id: DbId,
        person_id: DbId,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_sessions
             WHERE org_id = $1 AND project_id = $2 AND person_id = $3
               AND check_out_ts IS NULL"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(org_id)
            .bind(project_id)
            .bind(person_id)
            .fetch_optional(conn)
            .await
    }

    /// Find and row-lock the most recent open session for a key.
    pub async fn find_open_for_update(
        conn: &mut PgConnection,
        org_id: DbId,
        project_id: DbId,
        person_id: DbId,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_sessions
             WHERE org_id = $1 AND project_id = $2 AND person_id = $3
               AND check_out_ts IS NULL
             ORDER BY check_in_ts DESC, id DESC
             LIMIT 1
             FOR UPDATE"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(org_id)
            .bind(project_id)
            .bind(person_id)
            .fetch_optional(conn)
            .await
    }

    /// Find the most recently closed session for a key.
    pub async fn find_latest_closed(
        conn: &mut PgConnection,
        org_id: DbId,
        project_id: DbId,
        person_id: DbId,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_sessions
             WHERE org_id = $1 AND project_id = $2 AND person_id = $3
               AND check_out_ts IS NOT NULL
             ORDER BY check_out_ts DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(org_id)
            .bind(project_id)
            .bind(person_id)
            .fetch_optional(conn)
            .await
    }

    /// Close an open session. Returns `None` if it was closed concurrently.
    pub async fn close(
        conn: &mut PgConnection,
        id: DbId,
        check_out_ts: Timestamp,
        integrity_hash: &str,
    ) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "UPDATE attendance_sessions
             SET check_out_ts = $2, integrity_hash = $3
             WHERE id = $1 AND check_out_ts IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .bind(check_out_ts)
            .bind(integrity_hash)
            .fetch_optional(conn)
            .await
    }

    /// Overwrite both timestamps of a session and mark it corrected.
    pub async fn apply_correction(
        conn: &mut PgConnection,
        id: DbId,
        check_in_ts: Timestamp,
        check_out_ts: Option<Timestamp>,
        integrity_hash: &str,
    ) -> Result<AttendanceSession, sqlx::Error> {
        let query = format!(
            "UPDATE attendance_sessions
             SET check_in_ts = $2, check_out_ts = $3, integrity_hash = $4, corrected = true
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .bind(check_in_ts)
            .bind(check_out_ts)
            .bind(integrity_hash)
            .fetch_one(conn)
            .await
    }

    /// List a project's sessions whose check-in falls in `[from, to)`.
    ///
    /// Ordered by check-in time, then id, which is also the export order.
    pub async fn list_by_project_range(
        pool: &PgPool,
        org_id: DbId,
        project_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_sessions
             WHERE org_id = $1 AND project_id = $2
               AND check_in_ts >= $3 AND check_in_ts < $4
             ORDER BY check_in_ts ASC, id ASC"
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(org_id)
            .bind(project_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Whether a session with this exact fingerprint already exists.
    pub async fn exists_with_hash(
        conn: &mut PgConnection,
        org_id: DbId,
        integrity_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM attendance_sessions
                WHERE org_id = $1 AND integrity_hash = $2
             )",
        )
        .bind(org_id)
        .bind(integrity_hash)
        .fetch_one(conn)
        .await
    }
}
