use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use sector_feed_api::app::{router, AppState};
use sector_feed_api::auth::{IdentityClient, ProviderTokenVerifier};
use sector_feed_api::config::config;
use sector_feed_api::database::{schema, DatabaseManager, PgStorage};
use sector_feed_api::is_development;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, IDENTITY_PROJECT_ID, etc.
    let _ = dotenvy::dotenv();

    let default_filter = if is_development!() { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let config = config();
    tracing::info!("Starting Sector Feed API in {:?} mode", config.environment);

    // One identity client per process; the key cache is shared by every request
    let identity = IdentityClient::init(&config.identity).context("identity provider is not configured")?;
    let verifier = ProviderTokenVerifier::new(Arc::new(identity), config.identity.verify_timeout());

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    if config.database.auto_migrate {
        schema::ensure_schema(&pool).await.context("failed to prepare schema")?;
    }

    let storage = PgStorage::new(pool.clone());
    let state = AppState::new(Arc::new(verifier), Arc::new(storage), config);
    let app = router(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Sector Feed API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, initiating shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, initiating shutdown"),
    }
}
