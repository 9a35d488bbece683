//! Audit event fan-out for the attendance ledger.
//!
//! - [`AuditBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Publishing never blocks or fails the caller.
//! - [`AuditEvent`] -- before/after record of one ledger transition.
//! - [`AuditSink`] -- destination for audit events ([`PgAuditSink`],
//!   [`WebhookAuditSink`]), both retried on a [`RetryPolicy`] backoff.
//! - [`AuditForwarder`] -- background task draining the bus into the sinks.

pub mod bus;
pub mod forwarder;
pub mod sink;

pub use bus::{AuditBus, AuditEvent};
pub use forwarder::AuditForwarder;
pub use sink::{AuditSink, PgAuditSink, RetryPolicy, SinkError, WebhookAuditSink};
