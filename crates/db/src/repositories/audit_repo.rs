//! Repository for the `audit_logs` table.

use sitelog_core::types::DbId;
use sqlx::PgPool;

use crate::models::audit::{AuditLog, CreateAuditLog};

const COLUMNS: &str = "id, org_id, actor_id, action, entity_type, entity_id, \
    before_json, after_json, occurred_at, created_at";

/// Audit logs are append-only; there is no update or delete.
pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn insert(pool: &PgPool, input: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs
                (org_id, actor_id, action, entity_type, entity_id,
                 before_json, after_json, occurred_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(input.org_id)
            .bind(input.actor_id)
            .bind(&input.action)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.before_json)
            .bind(&input.after_json)
            .bind(input.occurred_at)
            .fetch_one(pool)
            .await
    }

    /// List audit entries for one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        org_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs
             WHERE org_id = $1 AND entity_type = $2 AND entity_id = $3
             ORDER BY occurred_at ASC, id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(org_id)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }
}
