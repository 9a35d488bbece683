//! Audit sinks: where published [`AuditEvent`]s end up.

use std::time::Duration;

use async_trait::async_trait;
use sitelog_db::models::audit::CreateAuditLog;
use sitelog_db::repositories::AuditLogRepo;
use sitelog_db::DbPool;

use crate::bus::AuditEvent;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Record one event. Implementations own their retry policy.
    async fn record(&self, event: &AuditEvent) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Backoff schedule shared by the sinks: one attempt, then one more after
/// each delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        )
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Total number of attempts this policy makes.
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Run `attempt` until it succeeds or the schedule is exhausted,
    /// returning the last error.
    pub async fn run<F, Fut>(
        &self,
        sink: &'static str,
        event: &AuditEvent,
        mut attempt: F,
    ) -> Result<(), SinkError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<(), SinkError>> + Send,
    {
        let mut result = attempt().await;
        for (i, delay) in self.delays.iter().enumerate() {
            let Err(e) = &result else {
                break;
            };
            tracing::warn!(
                sink,
                attempt = i + 1,
                action = %event.action,
                error = %e,
                "Audit delivery failed, retrying"
            );
            tokio::time::sleep(*delay).await;
            result = attempt().await;
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Writes events to the `audit_logs` table. The default sink.
pub struct PgAuditSink {
    pool: DbPool,
    retry: RetryPolicy,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the backoff schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry = RetryPolicy::new(delays);
        self
    }

    async fn try_insert(&self, input: &CreateAuditLog) -> Result<(), SinkError> {
        AuditLogRepo::insert(&self.pool, input).await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn record(&self, event: &AuditEvent) -> Result<(), SinkError> {
        let input = CreateAuditLog {
            org_id: event.org_id,
            actor_id: event.actor_id,
            action: event.action.clone(),
            entity_type: event.entity_type.clone(),
            entity_id: event.entity_id,
            before_json: event.before.clone(),
            after_json: event.after.clone(),
            occurred_at: event.occurred_at,
        };
        self.retry
            .run(self.name(), event, || self.try_insert(&input))
            .await
    }
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// POSTs each event as JSON to an external collector, with retry.
pub struct WebhookAuditSink {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl WebhookAuditSink {
    pub fn new(url: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the backoff schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry = RetryPolicy::new(delays);
        self
    }

    async fn try_send(&self, event: &AuditEvent) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(event).send().await?;
        if !response.status().is_success() {
            return Err(SinkError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuditSink for WebhookAuditSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn record(&self, event: &AuditEvent) -> Result<(), SinkError> {
        let result = self.retry.run(self.name(), event, || self.try_send(event)).await;
        if result.is_err() {
            tracing::debug!(url = %self.url, "Audit webhook gave up");
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
