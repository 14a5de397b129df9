use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use monk_tenancy::app::{app, AppState};
use monk_tenancy::config;
use monk_tenancy::schema::FileDeclarationSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_DATA_ROOT, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Monk Tenancy in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if monk_tenancy::is_production!() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET is empty; every bearer token will be rejected");
    }

    let source = Arc::new(FileDeclarationSource::new(config.tenancy.declarations_path.clone()));
    let state = AppState::new(config.clone(), source);

    state
        .databases
        .health_check()
        .await
        .context("registry database unavailable")?;

    let databases = state.databases.clone();
    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Monk Tenancy listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    databases.close_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
