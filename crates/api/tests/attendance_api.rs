//! HTTP-level integration tests for check-in/out, corrections and session reads.

mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{body_json, get, get_anonymous, post_json, seed_member, seed_org, token_for, Seed};
use serde_json::json;
use sqlx::PgPool;

const WORKER: i64 = 100;
const OTHER_WORKER: i64 = 101;
const SUPERVISOR: i64 = 200;

async fn setup(pool: &PgPool) -> Seed {
    let seed = seed_org(pool).await;
    seed_member(pool, seed.org_id, WORKER, "worker").await;
    seed_member(pool, seed.org_id, OTHER_WORKER, "worker").await;
    seed_member(pool, seed.org_id, SUPERVISOR, "supervisor").await;
    seed
}

fn ts(value: &serde_json::Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

async fn check_in_at(pool: &PgPool, seed: &Seed, person: i64, at: &str) -> serde_json::Value {
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/attendance/check-in",
        &token_for(person, seed.org_id),
        json!({"project_id": seed.project_id, "at": at}),
    )
    .await;
    body_json(response).await
}

async fn check_out_at(pool: &PgPool, seed: &Seed, person: i64, at: &str) -> serde_json::Value {
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/attendance/check-out",
        &token_for(person, seed.org_id),
        json!({"project_id": seed.project_id, "at": at}),
    )
    .await;
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Check-in
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_in_creates_session(pool: PgPool) {
    let seed = setup(&pool).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/attendance/check-in",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": seed.project_id, "at": "2025-03-01T07:00:00Z"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["data"]["session_id"].is_number());
    assert_eq!(json["data"]["already_open"], false);
    assert_eq!(
        ts(&json["data"]["check_in_ts"]),
        "2025-03-01T07:00:00Z".parse::<DateTime<Utc>>().unwrap()
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repeated_check_in_returns_existing_session(pool: PgPool) {
    let seed = setup(&pool).await;
    let first = check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/attendance/check-in",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": seed.project_id, "at": "2025-03-01T07:05:00Z"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["already_open"], true);
    assert_eq!(json["data"]["session_id"], first["data"]["session_id"]);
    assert_eq!(
        ts(&json["data"]["check_in_ts"]),
        ts(&first["data"]["check_in_ts"])
    );

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendance_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_check_ins_open_exactly_one_session(pool: PgPool) {
    const REQUESTS: usize = 8;
    let seed = setup(&pool).await;
    let token = token_for(WORKER, seed.org_id);

    let mut requests = tokio::task::JoinSet::new();
    for _ in 0..REQUESTS {
        let app = common::build_test_app(pool.clone());
        let token = token.clone();
        let body = json!({"project_id": seed.project_id, "at": "2025-03-01T07:00:00Z"});
        requests.spawn(async move {
            let response = post_json(app, "/api/v1/attendance/check-in", &token, body).await;
            (response.status(), body_json(response).await)
        });
    }

    let mut created = 0;
    let mut session_ids = Vec::new();
    while let Some(joined) = requests.join_next().await {
        let (status, json) = joined.unwrap();
        match status {
            StatusCode::CREATED => {
                created += 1;
                assert_eq!(json["data"]["already_open"], false);
            }
            StatusCode::OK => assert_eq!(json["data"]["already_open"], true),
            other => panic!("unexpected status {other}: {json}"),
        }
        session_ids.push(json["data"]["session_id"].clone());
    }

    assert_eq!(created, 1);
    assert_eq!(session_ids.len(), REQUESTS);
    assert!(session_ids.iter().all(|id| *id == session_ids[0]));

    let (open,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM attendance_sessions WHERE check_out_ts IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(open, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_worker_cannot_check_in_someone_else(pool: PgPool) {
    let seed = setup(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/check-in",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": seed.project_id, "person_id": OTHER_WORKER}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_supervisor_can_check_in_a_worker(pool: PgPool) {
    let seed = setup(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/check-in",
        &token_for(SUPERVISOR, seed.org_id),
        json!({"project_id": seed.project_id, "person_id": WORKER}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_supervisor_cannot_check_in_a_non_member(pool: PgPool) {
    let seed = setup(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/check-in",
        &token_for(SUPERVISOR, seed.org_id),
        json!({"project_id": seed.project_id, "person_id": 9_999}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_in_on_disabled_project_is_rejected(pool: PgPool) {
    let seed = setup(&pool).await;
    let disabled = common::seed_project(&pool, seed.org_id, false).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/check-in",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": disabled}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_in_with_reconciled_source_is_rejected(pool: PgPool) {
    let seed = setup(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/check-in",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": seed.project_id, "source": "time_entry_reconciled"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_of_another_org_is_not_found(pool: PgPool) {
    let seed = setup(&pool).await;
    let other = seed_org(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/check-in",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": other.project_id}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Check-out
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_out_closes_session(pool: PgPool) {
    let seed = setup(&pool).await;
    let opened = check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/check-out",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": seed.project_id, "at": "2025-03-01T15:30:00Z"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["already_closed"], false);
    assert_eq!(json["data"]["session_id"], opened["data"]["session_id"]);
    assert_eq!(
        ts(&json["data"]["check_out_ts"]),
        "2025-03-01T15:30:00Z".parse::<DateTime<Utc>>().unwrap()
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repeated_check_out_is_a_no_op(pool: PgPool) {
    let seed = setup(&pool).await;
    check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;
    let first = check_out_at(&pool, &seed, WORKER, "2025-03-01T15:30:00Z").await;

    let second = check_out_at(&pool, &seed, WORKER, "2025-03-01T16:00:00Z").await;

    assert_eq!(second["data"]["already_closed"], true);
    assert_eq!(second["data"]["session_id"], first["data"]["session_id"]);
    assert_eq!(
        ts(&second["data"]["check_out_ts"]),
        ts(&first["data"]["check_out_ts"])
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_out_without_any_session(pool: PgPool) {
    let seed = setup(&pool).await;

    let json = check_out_at(&pool, &seed, WORKER, "2025-03-01T15:30:00Z").await;

    assert_eq!(json["data"]["already_closed"], true);
    assert!(json["data"]["session_id"].is_null());
    assert!(json["data"]["check_out_ts"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_out_before_check_in_is_rejected(pool: PgPool) {
    let seed = setup(&pool).await;
    check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/attendance/check-out",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": seed.project_id, "at": "2025-03-01T06:00:00Z"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (open,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM attendance_sessions WHERE check_out_ts IS NULL",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(open, 1);
}

// ---------------------------------------------------------------------------
// Corrections
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_day_with_correction(pool: PgPool) {
    let seed = setup(&pool).await;
    let opened = check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;
    let session_id = opened["data"]["session_id"].as_i64().unwrap();
    check_out_at(&pool, &seed, WORKER, "2025-03-01T15:30:00Z").await;

    let before = body_json(
        get(
            common::build_test_app(pool.clone()),
            &format!("/api/v1/attendance/sessions/{session_id}"),
            &token_for(WORKER, seed.org_id),
        )
        .await,
    )
    .await;
    assert_eq!(before["data"]["corrected"], false);

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/attendance/correct",
        &token_for(SUPERVISOR, seed.org_id),
        json!({
            "session_id": session_id,
            "field": "check_in_ts",
            "new_value": "2025-03-01T06:45:00Z",
            "reason": "Badge reader at the gate was offline"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let session = &json["data"]["session"];
    assert_eq!(session["corrected"], true);
    assert_eq!(
        ts(&session["check_in_ts"]),
        "2025-03-01T06:45:00Z".parse::<DateTime<Utc>>().unwrap()
    );
    assert_ne!(session["integrity_hash"], before["data"]["integrity_hash"]);
    assert!(json["data"]["correction_log_id"].is_number());

    let log = body_json(
        get(
            common::build_test_app(pool.clone()),
            &format!("/api/v1/attendance/sessions/{session_id}/corrections"),
            &token_for(WORKER, seed.org_id),
        )
        .await,
    )
    .await;
    let entries = log["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["field"], "check_in_ts");
    assert_eq!(entries[0]["changed_by"], SUPERVISOR);
    assert_eq!(
        ts(&entries[0]["old_value"]),
        "2025-03-01T07:00:00Z".parse::<DateTime<Utc>>().unwrap()
    );

    let verify = body_json(
        get(
            common::build_test_app(pool),
            &format!("/api/v1/attendance/sessions/{session_id}/verify"),
            &token_for(WORKER, seed.org_id),
        )
        .await,
    )
    .await;
    assert_eq!(verify["data"]["valid"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_worker_cannot_correct(pool: PgPool) {
    let seed = setup(&pool).await;
    let opened = check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/correct",
        &token_for(WORKER, seed.org_id),
        json!({
            "session_id": opened["data"]["session_id"],
            "field": "check_in_ts",
            "new_value": "2025-03-01T06:00:00Z",
            "reason": "I actually arrived earlier"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_correction_requires_a_reason(pool: PgPool) {
    let seed = setup(&pool).await;
    let opened = check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/correct",
        &token_for(SUPERVISOR, seed.org_id),
        json!({
            "session_id": opened["data"]["session_id"],
            "field": "check_in_ts",
            "new_value": "2025-03-01T06:45:00Z",
            "reason": "   fix   "
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_correction_cannot_invert_the_session(pool: PgPool) {
    let seed = setup(&pool).await;
    let opened = check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;
    check_out_at(&pool, &seed, WORKER, "2025-03-01T15:30:00Z").await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/correct",
        &token_for(SUPERVISOR, seed.org_id),
        json!({
            "session_id": opened["data"]["session_id"],
            "field": "check_out_ts",
            "new_value": "2025-03-01T06:00:00Z",
            "reason": "Entered the wrong shift end"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_correcting_unknown_session_returns_404(pool: PgPool) {
    let seed = setup(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/attendance/correct",
        &token_for(SUPERVISOR, seed.org_id),
        json!({
            "session_id": 999_999,
            "field": "check_in_ts",
            "new_value": "2025-03-01T06:45:00Z",
            "reason": "Badge reader at the gate was offline"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Listing and access control
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_sessions_by_date_range(pool: PgPool) {
    let seed = setup(&pool).await;
    check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;
    check_out_at(&pool, &seed, WORKER, "2025-03-01T15:00:00Z").await;
    check_in_at(&pool, &seed, WORKER, "2025-03-02T07:00:00Z").await;
    check_in_at(&pool, &seed, OTHER_WORKER, "2025-03-01T08:00:00Z").await;

    let uri = format!(
        "/api/v1/attendance/sessions?project_id={}&from=2025-03-01&to=2025-03-01",
        seed.project_id
    );
    let response = get(
        common::build_test_app(pool),
        &uri,
        &token_for(WORKER, seed.org_id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 2);
    let sessions = json["data"]["sessions"].as_array().unwrap();
    assert_eq!(sessions[0]["person_id"], WORKER);
    assert_eq!(sessions[1]["person_id"], OTHER_WORKER);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_inverted_list_range_is_rejected(pool: PgPool) {
    let seed = setup(&pool).await;

    let uri = format!(
        "/api/v1/attendance/sessions?project_id={}&from=2025-03-05&to=2025-03-01",
        seed.project_id
    );
    let response = get(
        common::build_test_app(pool),
        &uri,
        &token_for(WORKER, seed.org_id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_of_another_org_is_not_visible(pool: PgPool) {
    let seed = setup(&pool).await;
    let opened = check_in_at(&pool, &seed, WORKER, "2025-03-01T07:00:00Z").await;
    let other = seed_org(&pool).await;
    seed_member(&pool, other.org_id, 300, "owner").await;

    let response = get(
        common::build_test_app(pool),
        &format!(
            "/api/v1/attendance/sessions/{}",
            opened["data"]["session_id"]
        ),
        &token_for(300, other.org_id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_token_returns_401(pool: PgPool) {
    let seed = setup(&pool).await;

    let uri = format!(
        "/api/v1/attendance/sessions?project_id={}&from=2025-03-01&to=2025-03-01",
        seed.project_id
    );
    let response = get_anonymous(common::build_test_app(pool), &uri).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_token_returns_401(pool: PgPool) {
    let seed = setup(&pool).await;

    let uri = format!(
        "/api/v1/attendance/sessions?project_id={}&from=2025-03-01&to=2025-03-01",
        seed.project_id
    );
    let response = get(common::build_test_app(pool), &uri, "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_member_returns_403(pool: PgPool) {
    let seed = setup(&pool).await;

    let uri = format!(
        "/api/v1/attendance/sessions?project_id={}&from=2025-03-01&to=2025-03-01",
        seed.project_id
    );
    let response = get(
        common::build_test_app(pool),
        &uri,
        &token_for(4_242, seed.org_id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_in_publishes_audit_event(pool: PgPool) {
    let seed = setup(&pool).await;
    let bus = std::sync::Arc::new(sitelog_events::AuditBus::default());
    let mut rx = bus.subscribe();

    let response = post_json(
        common::build_test_app_with_bus(pool, bus.clone()),
        "/api/v1/attendance/check-in",
        &token_for(WORKER, seed.org_id),
        json!({"project_id": seed.project_id}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;

    let event = rx.try_recv().unwrap();
    assert_eq!(event.action, "attendance.check_in");
    assert_eq!(event.org_id, seed.org_id);
    assert_eq!(event.actor_id, Some(WORKER));
    assert_eq!(event.entity_id, json["data"]["session_id"].as_i64());
}
