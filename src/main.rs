use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use user_portal::config::{self, Config};
use user_portal::{app, init_tracing, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = config::load_env_file(Path::new(".env"));
    let config = Config::parse();
    init_tracing(&config);
    if env_file {
        info!("Loaded environment from .env");
    }

    let bind = config.bind;
    info!(database = %config.database, upload_dir = ?config.upload_dir, debug = config.debug, "Initializing state...");
    let state = AppState::new(config).await?;

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {bind}"))?;

    info!("🚀 User portal running on http://{bind}");
    info!("📋 Routes: / /login /signup /registered /upload /profile /download/<stored_filename> /logout");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install signal handler");
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
}
