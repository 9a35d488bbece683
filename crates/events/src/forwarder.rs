//! Background service that drains the [`AuditBus`](crate::bus::AuditBus)
//! into every configured [`AuditSink`].

use std::sync::Arc;

use sitelog_core::audit::is_mutating;
use tokio::sync::broadcast;

use crate::bus::AuditEvent;
use crate::sink::AuditSink;

pub struct AuditForwarder {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditForwarder {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    /// Run the forwarding loop until the bus is dropped.
    ///
    /// Sink failures are logged and never propagated; a lost audit record
    /// for a ledger mutation is logged at error level.
    pub async fn run(self, mut receiver: broadcast::Receiver<AuditEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.forward(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::error!(
                        skipped = n,
                        "Audit forwarder lagged, some events were not recorded"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Audit bus closed, forwarder shutting down");
                    break;
                }
            }
        }
    }

    async fn forward(&self, event: &AuditEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.record(event).await {
                if is_mutating(&event.action) {
                    tracing::error!(
                        sink = sink.name(),
                        action = %event.action,
                        entity_type = %event.entity_type,
                        entity_id = ?event.entity_id,
                        error = %e,
                        "Failed to record audit event"
                    );
                } else {
                    tracing::warn!(
                        sink = sink.name(),
                        action = %event.action,
                        error = %e,
                        "Failed to record audit event"
                    );
                }
            }
        }
    }
}
