use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sea_orm::DatabaseConnection;
use shared::{AuditLogger, Config};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::market::MarketDataClient;
use crate::training::TrainingQueue;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<DatabaseConnection>,
    pub audit: AuditLogger,
    pub market: MarketDataClient,
    pub training: TrainingQueue,
}

/// Background tasks owned by the process, joined on shutdown.
pub struct BackgroundTasks {
    audit: JoinHandle<()>,
    training: JoinHandle<()>,
}

impl AppState {
    /// Starts the audit writer and the training worker, then re-queues training
    /// jobs left over from a previous run.
    pub async fn start(
        config: Config,
        db: DatabaseConnection,
        shutdown: CancellationToken,
    ) -> Result<(Self, BackgroundTasks)> {
        let db = Arc::new(db);
        let (audit, audit_task) = AuditLogger::spawn(db.clone());
        let (training, training_task) =
            TrainingQueue::spawn(db.clone(), audit.clone(), config.training_delay, shutdown);
        training.recover().await?;

        let market = MarketDataClient::new(config.api_base_url.clone());
        info!(base_url = %market.base_url, "Market data client ready");

        let state = AppState {
            config: Arc::new(config),
            db,
            audit,
            market,
            training,
        };
        Ok((
            state,
            BackgroundTasks {
                audit: audit_task,
                training: training_task,
            },
        ))
    }
}

impl BackgroundTasks {
    /// Waits for the worker to stop and the audit queue to drain. Every `AppState`
    /// clone must already be dropped, otherwise the audit writer keeps running.
    pub async fn join(self, timeout: Duration) {
        if let Err(e) = self.training.await {
            warn!(error = %e, "Training worker panicked");
        }
        match tokio::time::timeout(timeout, self.audit).await {
            Ok(Ok(())) => info!("Audit log drained"),
            Ok(Err(e)) => warn!(error = %e, "Audit writer panicked"),
            Err(_) => warn!("Timed out waiting for the audit log to drain"),
        }
    }
}
