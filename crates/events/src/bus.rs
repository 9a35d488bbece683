//! In-process audit bus backed by a `tokio::sync::broadcast` channel.
//!
//! Ledger operations publish an [`AuditEvent`] after their transaction
//! commits. Delivery is asynchronous: a slow or failing sink never delays
//! or fails the operation that produced the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitelog_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// AuditEvent
// ---------------------------------------------------------------------------

/// Before/after record of a single ledger transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Dot-separated action name, see `sitelog_core::audit::actions`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub org_id: DbId,
    /// The acting person. `None` for system jobs.
    pub actor_id: Option<DbId>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(org_id: DbId, action: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            org_id,
            actor_id: None,
            before: None,
            after: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_entity(mut self, entity_id: DbId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, actor_id: DbId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Attach the entity state before the transition.
    ///
    /// Values that fail to serialize are recorded as `null` rather than
    /// dropping the event.
    pub fn with_before(mut self, before: &impl Serialize) -> Self {
        self.before = Some(serde_json::to_value(before).unwrap_or(serde_json::Value::Null));
        self
    }

    /// Attach the entity state after the transition.
    pub fn with_after(mut self, after: &impl Serialize) -> Self {
        self.after = Some(serde_json::to_value(after).unwrap_or(serde_json::Value::Null));
        self
    }
}

// ---------------------------------------------------------------------------
// AuditBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out audit bus, shared via `Arc<AuditBus>`.
pub struct AuditBus {
    sender: broadcast::Sender<AuditEvent>,
}

impl AuditBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: AuditEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Audit event published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.sender.subscribe()
    }
}

impl Default for AuditBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
