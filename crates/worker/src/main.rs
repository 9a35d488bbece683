use std::time::Duration;

use chrono::Utc;
use sitelog_worker::config::ReconcileConfig;
use sitelog_worker::reconcile::{self, ReconcileScope};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sitelog_worker=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ReconcileConfig::from_env();
    let database_url = std::env::var("DATABASE_URL")?;

    // --- Database ---
    let pool = sitelog_db::create_pool(&database_url).await?;
    sitelog_db::health_check(&pool).await?;
    sitelog_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    // --- Job loop ---
    let cancel = CancellationToken::new();
    let job = tokio::spawn(run_periodic(pool, config, cancel.clone()));

    shutdown_signal().await;
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(30), job).await;
    tracing::info!("Worker stopped");

    Ok(())
}

/// Reconcile the trailing lookback window every `interval` until cancelled.
async fn run_periodic(pool: PgPool, config: ReconcileConfig, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        lookback_hours = config.lookback.num_hours(),
        "Reconciliation job started"
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconciliation job stopping");
                break;
            }
            _ = interval.tick() => {
                let to = Utc::now();
                let scope = ReconcileScope {
                    org_id: None,
                    from: to - config.lookback,
                    to,
                };
                if let Err(e) = reconcile::run(&pool, &scope).await {
                    tracing::error!(error = %e, "Reconciliation run failed");
                }
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
