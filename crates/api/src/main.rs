use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use annotator_api::config::ServerConfig;
use annotator_api::notifications::ProgressBroadcaster;
use annotator_api::router::build_app_router;
use annotator_api::state::AppState;
use annotator_api::ws;
use annotator_scheduler::SchedulerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "annotator_api=debug,annotator_scheduler=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    let scheduler_config =
        SchedulerConfig::from_env().context("Invalid scheduler configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        lease_secs = scheduler_config.lease_duration.as_secs(),
        retry_budget = scheduler_config.retry_budget,
        finalize_policy = ?scheduler_config.finalize_policy,
        "Loaded configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = annotator_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    annotator_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    annotator_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- App state (event bus, scheduler, WebSocket manager) ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let state = AppState::new(pool, config.clone(), scheduler_config);
    let scheduler = Arc::clone(&state.scheduler);
    let ws_manager = Arc::clone(&state.ws_manager);

    // --- Lease recovery ---
    if scheduler.config().recover_leases {
        let report = scheduler
            .recover_leases()
            .await
            .context("Failed to recover leases")?;
        tracing::info!(
            rearmed = report.rearmed,
            released = report.released,
            "Recovered leases from previous run"
        );
    }

    // --- Background tasks ---
    let background_cancel = CancellationToken::new();

    let heartbeat_handle =
        ws::start_heartbeat(Arc::clone(&ws_manager), background_cancel.clone());

    let broadcaster = ProgressBroadcaster::new(Arc::clone(&ws_manager));
    let broadcaster_handle = tokio::spawn(
        broadcaster.run(state.event_bus.subscribe(), background_cancel.clone()),
    );
    tracing::info!("Heartbeat and progress broadcaster started");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Leases first, so released videos are visible to the next process.
    let released = scheduler.shutdown().await;
    tracing::info!(released, "Lease timers stopped");

    background_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, broadcaster_handle).await;
    let _ = tokio::time::timeout(shutdown_timeout, heartbeat_handle).await;
    tracing::info!("Background tasks stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). If a handler cannot
/// be installed the error is logged and that signal is never awaited.
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
