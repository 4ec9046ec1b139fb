//! Simulated model training as durable background jobs.
//!
//! A job row is written next to its model row, then the job id is handed to the
//! worker. The worker spawns one runner per job, each holding a child of the root
//! shutdown token. A runner sleeps until `run_after`, claims the job, and flips the
//! model to `trained` with generated metrics, or to `failed` if anything errors.
//! Jobs left `queued`/`running` by a stopped process are picked up by
//! [`TrainingQueue::recover`] on the next start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, QueryOrder};
use shared::entity::{ai_models, training_jobs};
use shared::{AuditEntry, AuditLogger, TrainingJobStatus, TrainingMetrics};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::repositories::ModelRepository;

#[derive(Clone)]
pub struct TrainingQueue {
    inner: Arc<Inner>,
}

struct Inner {
    db: Arc<DatabaseConnection>,
    models: ModelRepository,
    audit: AuditLogger,
    delay: Duration,
    tx: mpsc::UnboundedSender<i32>,
    shutdown: CancellationToken,
    // job id -> runner token
    active: Mutex<HashMap<i32, CancellationToken>>,
}

impl Inner {
    fn active(&self) -> MutexGuard<'_, HashMap<i32, CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrainingQueue {
    pub fn spawn(
        db: Arc<DatabaseConnection>,
        audit: AuditLogger,
        delay: Duration,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            models: ModelRepository::new(db.clone()),
            db,
            audit,
            delay,
            tx,
            shutdown,
            active: Mutex::new(HashMap::new()),
        });
        let handle = tokio::spawn(run_worker(inner.clone(), rx));
        (Self { inner }, handle)
    }

    /// Writes the job row for `model`. Call [`Self::enqueue`] once the surrounding
    /// transaction has committed.
    pub async fn create_job<C>(
        &self,
        db: &C,
        model: &ai_models::Model,
        bars_used: usize,
    ) -> Result<training_jobs::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        let delay = chrono::Duration::from_std(self.inner.delay).unwrap_or_else(|_| chrono::Duration::zero());
        training_jobs::ActiveModel {
            model_id: ActiveValue::Set(model.id),
            symbol: ActiveValue::Set(model.symbol.clone()),
            timeframe: ActiveValue::Set(model.timeframe.clone()),
            bars_used: ActiveValue::Set(i32::try_from(bars_used).unwrap_or(i32::MAX)),
            status: ActiveValue::Set(TrainingJobStatus::Queued.to_string()),
            run_after: ActiveValue::Set(now + delay),
            error: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub fn enqueue(&self, job_id: i32) {
        if self.inner.tx.send(job_id).is_err() {
            warn!(job_id, "Training worker is gone, job stays queued until the next start");
        }
    }

    /// Re-queues every job a previous process left unfinished.
    pub async fn recover(&self) -> Result<usize> {
        let db = self.inner.db.as_ref();

        // Interrupted mid-step: put them back in line
        training_jobs::Entity::update_many()
            .col_expr(training_jobs::Column::Status, Expr::value(TrainingJobStatus::Queued.as_str()))
            .col_expr(training_jobs::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(training_jobs::Column::Status.eq(TrainingJobStatus::Running.as_str()))
            .exec(db)
            .await?;

        let jobs = training_jobs::Entity::find()
            .filter(training_jobs::Column::Status.eq(TrainingJobStatus::Queued.as_str()))
            .order_by_asc(training_jobs::Column::RunAfter)
            .all(db)
            .await
            .context("Failed to load pending training jobs")?;

        for job in &jobs {
            self.enqueue(job.id);
        }
        if !jobs.is_empty() {
            info!(count = jobs.len(), "Recovered pending training jobs");
        }
        Ok(jobs.len())
    }

    /// Cancels the pending job of `model_id`. Returns false when the model is not
    /// in training any more.
    pub async fn cancel(&self, model_id: i32) -> Result<bool> {
        // The model flip decides the race against a runner finishing right now.
        if !self.inner.models.mark_failed(model_id).await? {
            return Ok(false);
        }

        let pending = TrainingJobStatus::pending();
        let jobs = training_jobs::Entity::find()
            .filter(training_jobs::Column::ModelId.eq(model_id))
            .filter(training_jobs::Column::Status.is_in(pending.iter().map(|s| s.as_str())))
            .all(self.inner.db.as_ref())
            .await?;

        for job in jobs {
            set_job_status(
                self.inner.db.as_ref(),
                job.id,
                TrainingJobStatus::Cancelled,
                Some("Cancelled by request".to_string()),
                &pending,
            )
            .await?;
            if let Some(token) = self.inner.active().remove(&job.id) {
                token.cancel();
            }
        }

        info!(model_id, "Training cancelled");
        Ok(true)
    }

    pub fn pending_jobs(&self) -> usize {
        self.inner.active().len()
    }
}

async fn run_worker(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<i32>) {
    info!("Training worker started");
    loop {
        tokio::select! {
            () = inner.shutdown.cancelled() => {
                info!("Training worker shutting down");
                break;
            }
            next = rx.recv() => {
                let Some(job_id) = next else { break };
                let token = inner.shutdown.child_token();
                inner.active().insert(job_id, token.clone());
                tokio::spawn(run_job(inner.clone(), job_id, token));
            }
        }
    }
}

async fn run_job(inner: Arc<Inner>, job_id: i32, token: CancellationToken) {
    if let Err(e) = execute(&inner, job_id, &token).await {
        error!(job_id, error = %e, "Training job runner failed");
    }
    inner.active().remove(&job_id);
}

async fn execute(inner: &Inner, job_id: i32, token: &CancellationToken) -> Result<()> {
    let Some(job) = training_jobs::Entity::find_by_id(job_id)
        .one(inner.db.as_ref())
        .await?
    else {
        warn!(job_id, "Training job vanished before it ran");
        return Ok(());
    };
    if job.status != TrainingJobStatus::Queued.as_str() {
        debug!(job_id, status = %job.status, "Training job is not queued, skipping");
        return Ok(());
    }

    let wait = (job.run_after - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    tokio::select! {
        () = token.cancelled() => {
            debug!(job_id, "Training job stopped before it ran");
            return Ok(());
        }
        () = tokio::time::sleep(wait) => {}
    }

    if !set_job_status(
        inner.db.as_ref(),
        job_id,
        TrainingJobStatus::Running,
        None,
        &[TrainingJobStatus::Queued],
    )
    .await?
    {
        return Ok(());
    }

    match finish_training(inner, &job).await {
        Ok(Some(metrics)) => {
            set_job_status(
                inner.db.as_ref(),
                job_id,
                TrainingJobStatus::Completed,
                None,
                &[TrainingJobStatus::Running],
            )
            .await?;
            info!(job_id, model_id = job.model_id, accuracy = metrics.accuracy, "Model trained");
            inner.audit.record(
                AuditEntry::info(
                    "model",
                    "model_trained",
                    format!(
                        "Model {} trained on {} {} bars, accuracy {:.4}",
                        job.model_id, job.bars_used, job.symbol, metrics.accuracy
                    ),
                )
                .with_ref("model", job.model_id),
            );
        }
        Ok(None) => {
            debug!(job_id, model_id = job.model_id, "Model left training before completion");
        }
        Err(e) => fail_job(inner, &job, &e).await,
    }
    Ok(())
}

async fn finish_training(inner: &Inner, job: &training_jobs::Model) -> Result<Option<TrainingMetrics>> {
    let model = inner
        .models
        .find_by_id(job.model_id)
        .await?
        .with_context(|| format!("Model {} no longer exists", job.model_id))?;
    let hyperparameters: serde_json::Value = serde_json::from_str(&model.hyperparameters)
        .context("Stored hyperparameters are not valid JSON")?;
    let epochs = hyperparameters
        .get("epochs")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);

    let metrics = simulate_metrics(&mut rand::thread_rng(), job.bars_used, epochs);
    if inner.models.mark_trained(model.id, &metrics).await? {
        Ok(Some(metrics))
    } else {
        Ok(None)
    }
}

async fn fail_job(inner: &Inner, job: &training_jobs::Model, cause: &anyhow::Error) {
    let message = format!("{:#}", cause);
    error!(job_id = job.id, model_id = job.model_id, error = %message, "Training job failed");

    if let Err(e) = inner.models.mark_failed(job.model_id).await {
        error!(model_id = job.model_id, error = %e, "Failed to mark model as failed");
    }
    if let Err(e) = set_job_status(
        inner.db.as_ref(),
        job.id,
        TrainingJobStatus::Failed,
        Some(message.clone()),
        &[TrainingJobStatus::Running],
    )
    .await
    {
        error!(job_id = job.id, error = %e, "Failed to mark training job as failed");
    }

    inner.audit.record(
        AuditEntry::error("model", "model_training_failed", message).with_ref("model", job.model_id),
    );
}

/// Conditional status transition; true when the row was in one of `from`.
async fn set_job_status<C>(
    db: &C,
    job_id: i32,
    to: TrainingJobStatus,
    error: Option<String>,
    from: &[TrainingJobStatus],
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let mut update = training_jobs::Entity::update_many()
        .col_expr(training_jobs::Column::Status, Expr::value(to.as_str()))
        .col_expr(training_jobs::Column::UpdatedAt, Expr::value(Utc::now()));
    if let Some(error) = error {
        update = update.col_expr(training_jobs::Column::Error, Expr::value(error));
    }
    let result = update
        .filter(training_jobs::Column::Id.eq(job_id))
        .filter(training_jobs::Column::Status.is_in(from.iter().map(|s| s.as_str())))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Placeholder metrics; no model is actually fitted.
pub fn simulate_metrics<R>(rng: &mut R, bars_used: i32, epochs: u32) -> TrainingMetrics
where
    R: Rng + ?Sized,
{
    let precision = rng.gen_range(0.60..0.90);
    let recall = rng.gen_range(0.55..0.90);
    TrainingMetrics {
        accuracy: round4(rng.gen_range(0.65..0.92)),
        precision: round4(precision),
        recall: round4(recall),
        f1_score: round4(2.0 * precision * recall / (precision + recall)),
        loss: round4(rng.gen_range(0.05..0.35)),
        sharpe_ratio: round4(rng.gen_range(0.8..2.5)),
        epochs,
        bars_used,
        trained_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_simulated_metrics_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let metrics = simulate_metrics(&mut rng, 500, 100);
            assert!((0.65..=0.92).contains(&metrics.accuracy));
            assert!(metrics.f1_score <= metrics.precision.max(metrics.recall) + 1e-4);
            assert!(metrics.f1_score >= metrics.precision.min(metrics.recall) - 1e-4);
            assert_eq!(metrics.bars_used, 500);
            assert_eq!(metrics.epochs, 100);
        }
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }
}
