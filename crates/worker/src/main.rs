use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schoolnet_events::{Deliveries, EventBus, Notifier, NotifierConfig};
use schoolnet_worker::{JobContext, Scheduler, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schoolnet_worker=debug,schoolnet_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = schoolnet_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    schoolnet_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    schoolnet_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Notifier ---
    let notifier = Notifier::new(
        pool,
        Arc::new(EventBus::default()),
        Deliveries::from_env(),
        NotifierConfig::from_env(),
    );

    // --- Jobs ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        disabled = config.disabled.len(),
        skip_weekends = config.skip_weekends,
        "Loaded worker configuration"
    );
    let scheduler = Scheduler::new(JobContext::new(notifier, config.skip_weekends), config);

    let cancel = CancellationToken::new();
    let handles = scheduler.spawn(cancel.clone());
    tracing::info!(jobs = handles.len(), "Worker started");

    shutdown_signal().await;

    tracing::info!("Shutting down worker");
    cancel.cancel();
    Scheduler::join(handles, Duration::from_secs(5)).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
