use std::time::Duration;

use anyhow::Result;
use api::{router, AppState};
use migration::{Migrator, MigratorTrait};
use shared::{get_db_connection, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Sentinel API server...");

    let config = Config::from_env()?;
    let db = get_db_connection(&config.database_url).await?;
    info!("Connected to database");

    if config.run_migrations {
        Migrator::up(&db, None).await?;
        info!("Database migrations applied");
    }

    let bind_addr = config.bind_addr.clone();
    let shutdown = CancellationToken::new();
    let (state, tasks) = AppState::start(config, db, shutdown.clone()).await?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API server listening on http://{}", bind_addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Shutdown signal received, stopping gracefully...");
            signal.cancel();
        })
        .await?;

    // The router (and every AppState clone in it) is gone once serve returns.
    shutdown.cancel();
    tasks.join(Duration::from_secs(5)).await;
    info!("API server stopped");

    Ok(())
}
