pub mod attendance;
pub mod health;
pub mod period_locks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /attendance/check-in                       check in (POST)
/// /attendance/check-out                      check out (POST)
/// /attendance/correct                        correct a session (POST, supervisor+)
/// /attendance/sessions                       list by project and date range
/// /attendance/sessions/{id}                  get one session
/// /attendance/sessions/{id}/corrections      correction log of a session
/// /attendance/sessions/{id}/verify           recompute and compare fingerprint
/// /attendance/export                         compliance export (supervisor+)
/// /attendance/reconcile                      run reconciliation (POST, supervisor+)
/// /attendance/review-flags                   unresolved collisions (supervisor+)
///
/// /period-locks                              list locks of a project
/// /period-locks/status                       is a date locked
/// /period-locks/lock                         lock a range (POST, admin+)
/// /period-locks/unlock                       unlock a range (POST, owner)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/attendance", attendance::router())
        .nest("/period-locks", period_locks::router())
}
