use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sitelog_events::{AuditBus, AuditForwarder, AuditSink, PgAuditSink, WebhookAuditSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitelog_api::config::ServerConfig;
use sitelog_api::router::build_app_router;
use sitelog_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sitelog_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = sitelog_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    sitelog_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    sitelog_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Audit ---
    let audit_bus = Arc::new(AuditBus::default());
    let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
    sinks.push(Arc::new(PgAuditSink::new(pool.clone())));
    if let Some(url) = &config.audit_webhook_url {
        let webhook =
            WebhookAuditSink::new(url.as_str()).expect("Failed to build audit webhook client");
        sinks.push(Arc::new(webhook));
        tracing::info!(url = %url, "Audit webhook sink enabled");
    }
    let forwarder_handle = tokio::spawn(AuditForwarder::new(sinks).run(audit_bus.subscribe()));
    tracing::info!("Audit forwarder started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        audit_bus: Arc::clone(&audit_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining audit events");

    // Dropping the last sender closes the channel and ends the forwarder.
    drop(audit_bus);
    let _ = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        forwarder_handle,
    )
    .await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
