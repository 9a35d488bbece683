//! Integration tests for the attendance session and correction repositories.

use chrono::{DateTime, TimeZone, Utc};
use sitelog_core::attendance::{CorrectionField, SessionSource, SessionState};
use sitelog_db::models::attendance_session::CreateAttendanceSession;
use sitelog_db::models::correction::CreateCorrection;
use sitelog_db::repositories::{AttendanceSessionRepo, CorrectionLogRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
}

async fn seed_project(pool: &PgPool) -> (i64, i64) {
    let (org_id,): (i64,) =
        sqlx::query_as("INSERT INTO organizations (name) VALUES ('Acme') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let (project_id,): (i64,) = sqlx::query_as(
        "INSERT INTO projects (org_id, name, attendance_enabled)
         VALUES ($1, 'Site A', true) RETURNING id",
    )
    .bind(org_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (org_id, project_id)
}

fn open_session(org_id: i64, project_id: i64, person_id: i64) -> CreateAttendanceSession {
    CreateAttendanceSession {
        org_id,
        state: SessionState::open(person_id, project_id, at(7, 0)),
        source: SessionSource::QrScan,
        time_entry_id: None,
    }
}

// ---------------------------------------------------------------------------
// Open-session uniqueness
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_open_session_is_rejected(pool: PgPool) {
    let (org_id, project_id) = seed_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let first = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap();
    assert!(second.is_none(), "second open session must not be created");

    let other_person =
        AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 11))
            .await
            .unwrap();
    assert!(other_person.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_close_then_reopen(pool: PgPool) {
    let (org_id, project_id) = seed_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let session = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap()
        .unwrap();
    assert!(session.hash_is_valid());

    let closed_state = session.state().close(at(15, 30)).unwrap();
    let closed = AttendanceSessionRepo::close(
        &mut conn,
        session.id,
        at(15, 30),
        &closed_state.fingerprint(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(closed.check_out_ts, Some(at(15, 30)));
    assert!(closed.hash_is_valid());
    assert_ne!(closed.integrity_hash, session.integrity_hash);

    // Closing twice is a no-op at the repository level.
    let again = AttendanceSessionRepo::close(&mut conn, session.id, at(16, 0), "x".repeat(64).as_str())
        .await
        .unwrap();
    assert!(again.is_none());

    let reopened =
        AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
            .await
            .unwrap();
    assert!(reopened.is_some());

    let latest = AttendanceSessionRepo::find_latest_closed(&mut conn, org_id, project_id, 10)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, session.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_out_before_check_in_violates_constraint(pool: PgPool) {
    let (org_id, project_id) = seed_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let session = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap()
        .unwrap();

    let result =
        AttendanceSessionRepo::close(&mut conn, session.id, at(6, 0), &"0".repeat(64)).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sessions_cannot_be_deleted(pool: PgPool) {
    let (org_id, project_id) = seed_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let session = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap()
        .unwrap();

    let result = sqlx::query("DELETE FROM attendance_sessions WHERE id = $1")
        .bind(session.id)
        .execute(&pool)
        .await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_exists_with_hash(pool: PgPool) {
    let (org_id, project_id) = seed_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let session = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap()
        .unwrap();

    assert!(
        AttendanceSessionRepo::exists_with_hash(&mut conn, org_id, &session.integrity_hash)
            .await
            .unwrap()
    );
    assert!(
        !AttendanceSessionRepo::exists_with_hash(&mut conn, org_id, &"f".repeat(64))
            .await
            .unwrap()
    );
}

// ---------------------------------------------------------------------------
// Correction log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_correction_log_is_append_only(pool: PgPool) {
    let (org_id, project_id) = seed_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let session = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap()
        .unwrap();

    let entry = CorrectionLogRepo::insert(
        &mut conn,
        &CreateCorrection {
            org_id,
            session_id: session.id,
            field: CorrectionField::CheckInTs,
            old_value: Some(at(7, 0)),
            new_value: at(6, 45),
            reason: "forgot to scan at the gate".to_string(),
            changed_by: 99,
        },
    )
    .await
    .unwrap();
    assert_eq!(entry.field, "check_in_ts");
    assert_eq!(entry.old_value, Some(at(7, 0)));

    let count = CorrectionLogRepo::count_by_session(&pool, org_id, session.id)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let update = sqlx::query("UPDATE attendance_corrections SET reason = 'edited' WHERE id = $1")
        .bind(entry.id)
        .execute(&pool)
        .await;
    assert!(update.is_err(), "correction rows must be immutable");

    let delete = sqlx::query("DELETE FROM attendance_corrections WHERE id = $1")
        .bind(entry.id)
        .execute(&pool)
        .await;
    assert!(delete.is_err(), "correction rows must not be deletable");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_apply_correction_marks_session(pool: PgPool) {
    let (org_id, project_id) = seed_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let session = AttendanceSessionRepo::insert(&mut conn, &open_session(org_id, project_id, 10))
        .await
        .unwrap()
        .unwrap();

    let plan = session
        .state()
        .plan_correction(CorrectionField::CheckInTs, at(6, 45))
        .unwrap();
    let updated = AttendanceSessionRepo::apply_correction(
        &mut conn,
        session.id,
        plan.next.check_in_ts,
        plan.next.check_out_ts,
        &plan.next.fingerprint(),
    )
    .await
    .unwrap();

    assert!(updated.corrected);
    assert_eq!(updated.check_in_ts, at(6, 45));
    assert!(updated.hash_is_valid());
}
