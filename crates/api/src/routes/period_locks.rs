//! Route definitions for period locks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::period_lock;
use crate::state::AppState;

/// Period lock routes mounted at `/period-locks`.
///
/// ```text
/// GET  /         -> list_locks
/// GET  /status   -> lock_status
/// POST /lock     -> lock
/// POST /unlock   -> unlock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(period_lock::list_locks))
        .route("/status", get(period_lock::lock_status))
        .route("/lock", post(period_lock::lock))
        .route("/unlock", post(period_lock::unlock))
}
