mod config;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use parlor_api::clock::SystemClock;
use parlor_api::router::router;
use parlor_api::service::{AppState, ChatService};
use parlor_api::sweeper;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=debug,parlor_api=debug,parlor_db=info,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Storage must be reachable before we accept requests
    let db = match parlor_db::Database::open(&config.db_path, config.storage_timeout) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database at {}: {:#}", config.db_path.display(), e);
            return Err(e);
        }
    };

    let state: AppState = Arc::new(ChatService::new(
        db.clone(),
        Arc::new(SystemClock),
        config.storage_timeout,
    ));

    // Background sweeper
    let shutdown = CancellationToken::new();
    let sweeper_handle = tokio::spawn(sweeper::run_sweep_loop(
        state.clone(),
        config.sweep,
        shutdown.clone(),
    ));

    let app = router(state);

    let addr = config.listen_addr()?;
    info!("Parlor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight sweep finish, then flush storage
    shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!("Sweeper task ended abnormally: {}", e);
    }
    db.checkpoint()?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
