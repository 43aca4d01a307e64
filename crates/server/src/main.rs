//! Verification-rs server entry point.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verification_api::AppState;
use verification_clients::{AccountClient, DatasetClient, MetricsClient};
use verification_common::Config;
use verification_core::VerificationService;
use verification_db::repositories::{
    CaseRepository, CloseRepository, DeclineReasonRepository, NoteRepository,
};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
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
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verification=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting verification-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = verification_db::connect(&config.database).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    verification_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Repositories
    let case_repo = CaseRepository::new(db.clone());
    let note_repo = NoteRepository::new(db.clone());
    let decline_repo = DeclineReasonRepository::new(db.clone());
    let close_repo = CloseRepository::new(db);

    // Upstream service clients
    let timeout = Duration::from_secs(config.dependencies.timeout_secs);
    let account_api = Arc::new(AccountClient::new(&config.dependencies.account, timeout)?);
    let dataset_api = Arc::new(DatasetClient::new(&config.dependencies.dataset, timeout)?);
    let metrics = Arc::new(MetricsClient::new(&config.dependencies.metrics, timeout)?);

    // Services
    let verification = Arc::new(VerificationService::new(
        case_repo,
        note_repo,
        decline_repo,
        close_repo,
        account_api,
        dataset_api,
    ));

    let state = AppState::new(
        verification,
        metrics,
        config.server.app_name.clone(),
        config.server.commit.clone(),
    );

    let app = Router::new()
        .merge(verification_api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
