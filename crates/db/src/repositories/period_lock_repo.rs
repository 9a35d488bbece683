//! Repository for the `period_locks` table.

use sitelog_core::period::PeriodRange;
use sitelog_core::types::{Date, DbId};
use sqlx::{PgConnection, PgPool};

use crate::models::period_lock::{CreatePeriodLock, PeriodLock};

const COLUMNS: &str = "id, org_id, project_id, period_start, period_end, locked, \
    locked_by, locked_at, reason, hash_signature, created_at, updated_at";

/// Provides lock/unlock and lock-coverage queries.
pub struct PeriodLockRepo;

impl PeriodLockRepo {
    /// Lock a range, re-activating a previously released row for the same range.
    ///
    /// Returns `None` if an active lock for exactly this range already exists.
    pub async fn lock(
        conn: &mut PgConnection,
        input: &CreatePeriodLock,
    ) -> Result<Option<PeriodLock>, sqlx::Error> {
        let query = format!(
            "INSERT INTO period_locks
                (org_id, project_id, period_start, period_end, locked,
                 locked_by, locked_at, reason, hash_signature)
             VALUES ($1, $2, $3, $4, true, $5, NOW(), $6, $7)
             ON CONFLICT (org_id, project_id, period_start, period_end)
             DO UPDATE SET
                locked = true,
                locked_by = EXCLUDED.locked_by,
                locked_at = EXCLUDED.locked_at,
                reason = EXCLUDED.reason,
                hash_signature = EXCLUDED.hash_signature
             WHERE NOT period_locks.locked
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PeriodLock>(&query)
            .bind(input.org_id)
            .bind(input.project_id)
            .bind(input.range.start)
            .bind(input.range.end)
            .bind(input.locked_by)
            .bind(&input.reason)
            .bind(&input.hash_signature)
            .fetch_optional(conn)
            .await
    }

    /// Find and row-lock the active lock for exactly this range.
    pub async fn find_active_for_update(
        conn: &mut PgConnection,
        org_id: DbId,
        project_id: DbId,
        range: &PeriodRange,
    ) -> Result<Option<PeriodLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM period_locks
             WHERE org_id = $1 AND project_id = $2
               AND period_start = $3 AND period_end = $4
               AND locked
             FOR UPDATE"
        );
        sqlx::query_as::<_, PeriodLock>(&query)
            .bind(org_id)
            .bind(project_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_optional(conn)
            .await
    }

    /// Release a lock, clearing the lock metadata and recording the reason.
    pub async fn release(
        conn: &mut PgConnection,
        id: DbId,
        reason: &str,
    ) -> Result<PeriodLock, sqlx::Error> {
        let query = format!(
            "UPDATE period_locks
             SET locked = false, locked_by = NULL, locked_at = NULL,
                 hash_signature = NULL, reason = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PeriodLock>(&query)
            .bind(id)
            .bind(reason)
            .fetch_one(conn)
            .await
    }

    /// Whether any active lock on the project contains `date`.
    pub async fn is_locked(
        pool: &PgPool,
        org_id: DbId,
        project_id: DbId,
        date: Date,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM period_locks
                WHERE org_id = $1 AND project_id = $2 AND locked
                  AND period_start <= $3 AND period_end >= $3
             )",
        )
        .bind(org_id)
        .bind(project_id)
        .bind(date)
        .fetch_one(pool)
        .await
    }

    /// Find the first active lock containing any of `dates`.
    ///
    /// Runs on the caller's connection so a correction sees a consistent
    /// snapshot with the session row it holds.
    pub async fn find_covering(
        conn: &mut PgConnection,
        org_id: DbId,
        project_id: DbId,
        dates: &[Date],
    ) -> Result<Option<PeriodLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM period_locks
             WHERE org_id = $1 AND project_id = $2 AND locked
               AND EXISTS (
                   SELECT 1 FROM unnest($3::date[]) AS d(day)
                   WHERE d.day BETWEEN period_start AND period_end
               )
             ORDER BY period_start ASC, id ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, PeriodLock>(&query)
            .bind(org_id)
            .bind(project_id)
            .bind(dates)
            .fetch_optional(conn)
            .await
    }

    /// Whether any active lock overlaps the given range.
    pub async fn overlaps_range(
        pool: &PgPool,
        org_id: DbId,
        project_id: DbId,
        range: &PeriodRange,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM period_locks
                WHERE org_id = $1 AND project_id = $2 AND locked
                  AND period_start <= $4 AND period_end >= $3
             )",
        )
        .bind(org_id)
        .bind(project_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(pool)
        .await
    }

    /// List a project's lock rows, active and released, newest range first.
    pub async fn list_by_project(
        pool: &PgPool,
        org_id: DbId,
        project_id: DbId,
        active_only: bool,
    ) -> Result<Vec<PeriodLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM period_locks
             WHERE org_id = $1 AND project_id = $2
               AND ($3 = false OR locked)
             ORDER BY period_start DESC, id DESC"
        );
        sqlx::query_as::<_, PeriodLock>(&query)
            .bind(org_id)
            .bind(project_id)
            .bind(active_only)
            .fetch_all(pool)
            .await
    }
}
