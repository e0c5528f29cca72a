use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use minibrs_core::{AppConfig, Services, open_storage};

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = AppConfig::load()?;
    config.apply_env_overrides()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let storage = open_storage(&config)?;
    tracing::info!(storage = %storage.describe(), "storage ready");
    let services = Arc::new(Services::new(storage));

    let app = minibrs_server::router(services, &config.server.context_path);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, context_path = %config.server.context_path, "minibrs server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
