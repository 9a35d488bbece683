//! Route definitions for the attendance ledger.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{attendance, reconcile};
use crate::state::AppState;

/// Attendance routes mounted at `/attendance`.
///
/// ```text
/// POST /check-in                   -> check_in
/// POST /check-out                  -> check_out
/// POST /correct                    -> correct
/// GET  /sessions                   -> list_sessions
/// GET  /sessions/{id}              -> get_session
/// GET  /sessions/{id}/corrections  -> list_corrections
/// GET  /sessions/{id}/verify       -> verify_session
/// GET  /export                     -> export_sessions
/// POST /reconcile                  -> run_reconciliation
/// GET  /review-flags               -> list_review_flags
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check-in", post(attendance::check_in))
        .route("/check-out", post(attendance::check_out))
        .route("/correct", post(attendance::correct))
        .route("/sessions", get(attendance::list_sessions))
        .route("/sessions/{id}", get(attendance::get_session))
        .route(
            "/sessions/{id}/corrections",
            get(attendance::list_corrections),
        )
        .route("/sessions/{id}/verify", get(attendance::verify_session))
        .route("/export", get(attendance::export_sessions))
        .route("/reconcile", post(reconcile::run_reconciliation))
        .route("/review-flags", get(reconcile::list_review_flags))
}
