//! Handlers for check-in/out, corrections, session reads and exports.

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sitelog_core::attendance::{validate_reason, CorrectionField, SessionSource};
use sitelog_core::export::{ExportFormat, ExportQuery};
use sitelog_core::period::PeriodRange;
use sitelog_core::types::{Date, DbId, Timestamp};
use sitelog_db::models::attendance_session::AttendanceSession;
use validator::Validate;

use crate::error::AppResult;
use crate::ledger;
use crate::ledger::attendance::{CheckIn, CheckOut};
use crate::ledger::correction::Correction;
use crate::middleware::rbac::{RequireMember, RequireSupervisor};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /attendance/check-in`.
///
/// `person_id` defaults to the caller and `at` to the server clock.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub project_id: DbId,
    pub person_id: Option<DbId>,
    pub at: Option<Timestamp>,
    pub source: Option<SessionSource>,
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub session_id: DbId,
    pub check_in_ts: Timestamp,
    pub already_open: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    pub project_id: DbId,
    pub person_id: Option<DbId>,
    pub at: Option<Timestamp>,
}

/// `session_id` and `check_out_ts` are null when the person has never been
/// checked in on the project.
#[derive(Debug, Serialize)]
pub struct CheckOutResponse {
    pub session_id: Option<DbId>,
    pub check_out_ts: Option<Timestamp>,
    pub already_closed: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CorrectRequest {
    pub session_id: DbId,
    pub field: CorrectionField,
    pub new_value: Timestamp,
    #[validate(custom(function = "validate_reason"))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct CorrectResponse {
    pub session: AttendanceSession,
    pub correction_log_id: DbId,
}

/// Inclusive UTC date range over `check_in_ts`.
#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub project_id: DbId,
    pub from: Date,
    pub to: Date,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub sessions: Vec<AttendanceSession>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub project_id: DbId,
    pub from: Date,
    pub to: Date,
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Check-in / check-out
// ---------------------------------------------------------------------------

/// POST /attendance/check-in
///
/// 201 when a session was opened, 200 when one was already open.
pub async fn check_in(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Json(input): Json<CheckInRequest>,
) -> AppResult<impl IntoResponse> {
    let cmd = CheckIn {
        project_id: input.project_id,
        person_id: input.person_id.unwrap_or(member.person_id),
        at: input.at.unwrap_or_else(Utc::now),
        source: input.source.unwrap_or(SessionSource::QrScan),
    };

    let outcome = ledger::attendance::check_in(&state, &member, &cmd).await?;
    let status = if outcome.already_open {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(DataResponse {
            data: CheckInResponse {
                session_id: outcome.session.id,
                check_in_ts: outcome.session.check_in_ts,
                already_open: outcome.already_open,
            },
        }),
    ))
}

/// POST /attendance/check-out
pub async fn check_out(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Json(input): Json<CheckOutRequest>,
) -> AppResult<impl IntoResponse> {
    let cmd = CheckOut {
        project_id: input.project_id,
        person_id: input.person_id.unwrap_or(member.person_id),
        at: input.at.unwrap_or_else(Utc::now),
    };

    let outcome = ledger::attendance::check_out(&state, &member, &cmd).await?;

    Ok(Json(DataResponse {
        data: CheckOutResponse {
            session_id: outcome.session.as_ref().map(|s| s.id),
            check_out_ts: outcome.session.as_ref().and_then(|s| s.check_out_ts),
            already_closed: outcome.already_closed,
        },
    }))
}

// ---------------------------------------------------------------------------
// Correction
// ---------------------------------------------------------------------------

/// POST /attendance/correct
///
/// Supervisor or above. 409 if the affected date falls in a locked period.
pub async fn correct(
    State(state): State<AppState>,
    RequireSupervisor(member): RequireSupervisor,
    Json(input): Json<CorrectRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let cmd = Correction {
        session_id: input.session_id,
        field: input.field,
        new_value: input.new_value,
        reason: input.reason,
    };
    let outcome = ledger::correction::correct(&state, &member, &cmd).await?;

    Ok(Json(DataResponse {
        data: CorrectResponse {
            session: outcome.session,
            correction_log_id: outcome.correction.id,
        },
    }))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /attendance/sessions?project_id&from&to
pub async fn list_sessions(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Query(params): Query<SessionsQuery>,
) -> AppResult<impl IntoResponse> {
    let range = PeriodRange::for_query(params.from, params.to)?;
    let sessions =
        ledger::attendance::list_sessions(&state, &member, params.project_id, &range).await?;
    let count = sessions.len();
    Ok(Json(DataResponse {
        data: SessionList { sessions, count },
    }))
}

/// GET /attendance/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = ledger::attendance::get_session(&state, &member, id).await?;
    Ok(Json(DataResponse { data: session }))
}

/// GET /attendance/sessions/{id}/corrections
pub async fn list_corrections(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let entries = ledger::attendance::list_corrections(&state, &member, id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /attendance/sessions/{id}/verify
pub async fn verify_session(
    State(state): State<AppState>,
    RequireMember(member): RequireMember,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let report = ledger::attendance::verify_session(&state, &member, id).await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// GET /attendance/export?project_id&from&to&format=csv|text
///
/// Supervisor or above. Returns the document bytes; the fingerprints are
/// in the trailer and repeated in response headers.
pub async fn export_sessions(
    State(state): State<AppState>,
    RequireSupervisor(member): RequireSupervisor,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let format: ExportFormat = match params.format.as_deref() {
        Some(f) => f.parse()?,
        None => ExportFormat::default(),
    };
    let query = ExportQuery {
        org_id: member.org_id,
        project_id: params.project_id,
        range: PeriodRange::for_query(params.from, params.to)?,
        format,
    };

    let document = ledger::export::export(&state, &member, &query).await?;

    let headers = [
        (CONTENT_TYPE, document.format.content_type().to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name(&query)),
        ),
        (
            HeaderName::from_static("x-content-fingerprint"),
            document.content_fingerprint.clone(),
        ),
        (
            HeaderName::from_static("x-document-fingerprint"),
            document.document_fingerprint.clone(),
        ),
    ];

    Ok((headers, document.body).into_response())
}
