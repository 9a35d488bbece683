use std::sync::Arc;

use sitelog_events::AuditBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: sitelog_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Fire-and-forget audit channel, drained by the audit forwarder.
    pub audit_bus: Arc<AuditBus>,
}
