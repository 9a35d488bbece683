//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`OrgMember`] and rejects requests whose membership
//! role ranks below the minimum. Roles rank `owner > admin > supervisor >
//! worker`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sitelog_core::error::CoreError;
use sitelog_core::roles::{ROLE_ADMIN, ROLE_OWNER, ROLE_SUPERVISOR};

use super::auth::OrgMember;
use crate::error::AppError;
use crate::state::AppState;

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    required: &'static str,
    message: &'static str,
) -> Result<OrgMember, AppError> {
    let member = OrgMember::from_request_parts(parts, state).await?;
    if !member.has_role(required) {
        tracing::info!(
            person_id = member.person_id,
            org_id = member.org_id,
            role = %member.role,
            required,
            "Rejected caller with insufficient role"
        );
        return Err(AppError::Core(CoreError::Forbidden(message.into())));
    }
    Ok(member)
}

/// Requires any active member of the caller's organisation.
///
/// Equivalent to [`OrgMember`] but self-documenting in route handlers.
pub struct RequireMember(pub OrgMember);

impl FromRequestParts<AppState> for RequireMember {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequireMember(
            OrgMember::from_request_parts(parts, state).await?,
        ))
    }
}

/// Requires `supervisor` or higher. Rejects with 403 Forbidden otherwise.
pub struct RequireSupervisor(pub OrgMember);

impl FromRequestParts<AppState> for RequireSupervisor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_SUPERVISOR, "Supervisor role required")
            .await
            .map(RequireSupervisor)
    }
}

/// Requires `admin` or `owner`. Rejects with 403 Forbidden otherwise.
pub struct RequireAdmin(pub OrgMember);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_ADMIN, "Admin role required")
            .await
            .map(RequireAdmin)
    }
}

/// Requires the `owner` role. Rejects with 403 Forbidden otherwise.
pub struct RequireOwner(pub OrgMember);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_OWNER, "Owner role required")
            .await
            .map(RequireOwner)
    }
}
