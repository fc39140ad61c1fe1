//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HttpCatalogSource, LogNotifier},
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_tracker_core::catalog::CountryCatalog;
use travel_tracker_core::ports::CatalogSource;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    if config.run_migrations {
        info!("Running database migrations...");
        db_adapter.run_migrations().await?;
        info!("Database migrations complete.");
    } else {
        info!("Skipping database migrations.");
    }

    // --- 3. Load the Country Catalog ---
    let catalog_source = HttpCatalogSource::new(reqwest::Client::new(), config.geo_url.clone());
    let catalog = match catalog_source.fetch_features().await {
        Ok(features) => CountryCatalog::new(features),
        Err(e) => {
            warn!("Country dataset unavailable, starting with an empty catalog: {}", e);
            CountryCatalog::default()
        }
    };

    // --- 4. Build the Shared AppState ---
    let shutdown = CancellationToken::new();
    let app_state = Arc::new(AppState {
        db: db_adapter.clone(),
        visited: db_adapter,
        notifier: Arc::new(LogNotifier),
        catalog: Arc::new(catalog),
        config: config.clone(),
        gates: Arc::default(),
        shutdown: shutdown.clone(),
    });

    // --- 5. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped.");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels `shutdown` so open maps close.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, closing connections...");
    shutdown.cancel();
}
