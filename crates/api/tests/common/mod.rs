#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use sitelog_api::auth::jwt::{generate_access_token, JwtConfig};
use sitelog_api::config::ServerConfig;
use sitelog_api::router::build_app_router;
use sitelog_api::state::AppState;
use sitelog_events::AuditBus;

const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and no audit webhook.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        audit_webhook_url: None,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// Audit events are published to a bus nobody drains; tests that care about
/// the audit trail subscribe through [`build_test_app_with_bus`].
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_bus(pool, Arc::new(AuditBus::default()))
}

pub fn build_test_app_with_bus(pool: PgPool, audit_bus: Arc<AuditBus>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        audit_bus,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub struct Seed {
    pub org_id: i64,
    pub project_id: i64,
}

/// An organisation with one attendance-enabled project.
pub async fn seed_org(pool: &PgPool) -> Seed {
    let (org_id,): (i64,) =
        sqlx::query_as("INSERT INTO organizations (name) VALUES ('Acme Builders') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let project_id = seed_project(pool, org_id, true).await;
    Seed { org_id, project_id }
}

pub async fn seed_project(pool: &PgPool, org_id: i64, attendance_enabled: bool) -> i64 {
    let (project_id,): (i64,) = sqlx::query_as(
        "INSERT INTO projects (org_id, name, attendance_enabled)
         VALUES ($1, 'Riverside Site', $2) RETURNING id",
    )
    .bind(org_id)
    .bind(attendance_enabled)
    .fetch_one(pool)
    .await
    .unwrap();
    project_id
}

pub async fn seed_member(pool: &PgPool, org_id: i64, person_id: i64, role: &str) {
    sqlx::query("INSERT INTO org_members (org_id, person_id, role) VALUES ($1, $2, $3)")
        .bind(org_id)
        .bind(person_id)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_time_entry(
    pool: &PgPool,
    seed: &Seed,
    person_id: i64,
    started_at: &str,
    stopped_at: Option<&str>,
) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO time_entries (org_id, project_id, person_id, started_at, stopped_at)
         VALUES ($1, $2, $3, $4::timestamptz, $5::timestamptz) RETURNING id",
    )
    .bind(seed.org_id)
    .bind(seed.project_id)
    .bind(person_id)
    .bind(started_at)
    .bind(stopped_at)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

/// A valid access token for `person_id` acting in `org_id`.
pub fn token_for(person_id: i64, org_id: i64) -> String {
    generate_access_token(person_id, org_id, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_anonymous(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
