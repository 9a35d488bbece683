use std::time::Duration;

/// Configuration of the periodic reconciliation runner.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Time between runs (default: 900 seconds).
    pub interval: Duration,
    /// Width of the trailing window each run covers (default: 48 hours).
    pub lookback: chrono::Duration,
}

impl ReconcileConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `RECONCILE_INTERVAL_SECS`  | `900`   |
    /// | `RECONCILE_LOOKBACK_HOURS` | `48`    |
    pub fn from_env() -> Self {
        let interval_secs: u64 = std::env::var("RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("RECONCILE_INTERVAL_SECS must be a valid u64");

        let lookback_hours: i64 = std::env::var("RECONCILE_LOOKBACK_HOURS")
            .unwrap_or_else(|_| "48".into())
            .parse()
            .expect("RECONCILE_LOOKBACK_HOURS must be a valid i64");

        assert!(interval_secs > 0, "RECONCILE_INTERVAL_SECS must be positive");
        assert!(lookback_hours > 0, "RECONCILE_LOOKBACK_HOURS must be positive");

        Self {
            interval: Duration::from_secs(interval_secs),
            lookback: chrono::Duration::hours(lookback_hours),
        }
    }
}
