//! JWT-based authentication and membership extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sitelog_core::error::CoreError;
use sitelog_core::roles;
use sitelog_core::types::DbId;
use sitelog_db::repositories::DirectoryRepo;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Caller extracted from a JWT Bearer token in the `Authorization` header.
///
/// Carries identity only; use [`OrgMember`] (or an `rbac` extractor) in
/// handlers that act on tenant data.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub person_id: DbId,
    /// Organisation named by the token. Not yet verified against membership.
    pub org_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            person_id: claims.sub,
            org_id: claims.org,
        })
    }
}

/// The caller's active membership in the organisation named by their token.
///
/// `org_id` is the tenant filter for every query the handler runs; `role`
/// comes from the membership row.
#[derive(Debug, Clone)]
pub struct OrgMember {
    pub person_id: DbId,
    pub org_id: DbId,
    pub role: String,
}

impl OrgMember {
    pub fn has_role(&self, required: &str) -> bool {
        roles::at_least(&self.role, required)
    }
}

impl FromRequestParts<AppState> for OrgMember {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        let membership =
            DirectoryRepo::find_membership(&state.pool, user.org_id, user.person_id).await?;

        match membership {
            Some(m) if m.is_active => Ok(OrgMember {
                person_id: m.person_id,
                org_id: m.org_id,
                role: m.role,
            }),
            _ => {
                tracing::info!(
                    person_id = user.person_id,
                    org_id = user.org_id,
                    "Rejected caller without active membership"
                );
                Err(AppError::Core(CoreError::Forbidden(
                    "No active membership in this organization".into(),
                )))
            }
        }
    }
}
