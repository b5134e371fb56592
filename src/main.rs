//! Minbar - community content site and flower shop

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minbar::{api, app, cache::create_cache, config::Config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minbar=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Minbar v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = std::env::var("MINBAR_CONFIG").unwrap_or_else(|_| "config.yml".to_string());
    let config = Config::load_with_env(Path::new(&config_path))?;
    tracing::info!("Configuration loaded from {}", config_path);

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Initialize cache
    let cache = create_cache(&config.cache).await?;
    tracing::info!("Cache initialized: {:?}", config.cache.driver);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let cors_origin = config.server.cors_origin.clone();

    let state = app::build_state(config, pool, cache)?;
    app::spawn_cleanup(&state);

    // Build router
    let app = api::build_router(state, &cors_origin);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
