use issue_service::{
    auth::load_auth_flags,
    build_router,
    config::TrackerConfig,
    services::{Database, LayeredSettings, MemoryTracker, MessageCatalog, Tracker},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracker_core::error::AppError;
use tracker_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = TrackerConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    issue_service::services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting issue service"
    );

    let settings = LayeredSettings::load(&config.settings_file)?;
    let auth_flags = Arc::new(load_auth_flags(&config.settings_file)?);
    let messages = Arc::new(MessageCatalog::english());

    let tracker = match &config.database {
        Some(db_config) => {
            let db = Database::connect(&db_config.url, db_config.max_connections).await?;
            db.run_migrations().await?;
            db.health_check().await?;
            settings.apply_overrides(db.load_config_overrides().await?);

            let db = Arc::new(db);
            Tracker::new(db.clone(), db, Arc::new(settings), messages, auth_flags)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            let store = Arc::new(MemoryTracker::new());
            Tracker::new(store.clone(), store, Arc::new(settings), messages, auth_flags)
        }
    };

    let state = AppState {
        config: config.clone(),
        tracker,
    };
    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
