use anyhow::Result;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod deliveries;
pub mod error;
pub mod listings;
pub mod metrics;
pub mod roles;
pub mod routes;
pub mod stats;
pub mod storage;
pub mod tips;
pub mod users;

use auth::AuthManager;
use config::Config;
use context::AppContext;
use storage::ObjectStorage;
use tips::TipClient;

pub async fn run() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let app_config = Arc::new(config);

    let bind_address = format!("0.0.0.0:{}", app_config.port);

    // Connect to database
    let db_pool = Arc::new(db::create_pool(&app_config.database_url, &app_config.db).await?);
    tracing::info!("Connected to database");

    // Apply database migrations
    tracing::info!("Applying database migrations...");
    sqlx::migrate!().run(&*db_pool).await?;
    tracing::info!("Database migrations applied successfully.");

    // Local object storage for uploaded photos
    tokio::fs::create_dir_all(&app_config.storage_dir).await?;
    let object_storage = Arc::new(ObjectStorage::new(
        app_config.storage_dir.clone(),
        app_config.public_base_url.clone(),
    ));

    let auth_manager = Arc::new(AuthManager::new(&app_config));
    let tip_client = Arc::new(TipClient::new(&app_config.tips)?);

    let app_context = Arc::new(AppContext::new(
        db_pool,
        auth_manager,
        app_config.clone(),
        object_storage,
        tip_client,
    ));

    let router = routes::create_router(app_context);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!("ZeroWaste Connect listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            tracing::info!("Shutdown signal received. Shutting down...");
        })
        .await?;

    Ok(())
}
