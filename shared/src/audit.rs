//! Best-effort audit trail.
//!
//! Handlers call [`AuditLogger::record`], which only pushes onto a channel. A single
//! writer task drains the channel into `audit_logs` in arrival order. A failed insert
//! is logged and dropped; it never reaches the request that produced the entry.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectionTrait, DatabaseConnection, DbErr};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::entity::audit_logs;
use crate::models::AuditLevel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub category: String,
    pub action: String,
    pub details: String,
    pub ref_type: Option<String>,
    pub ref_id: Option<i32>,
    pub level: AuditLevel,
}

impl AuditEntry {
    pub fn info(category: &str, action: &str, details: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            action: action.to_string(),
            details: details.into(),
            ref_type: None,
            ref_id: None,
            level: AuditLevel::Info,
        }
    }

    pub fn error(category: &str, action: &str, details: impl Into<String>) -> Self {
        Self {
            level: AuditLevel::Error,
            ..Self::info(category, action, details)
        }
    }

    pub fn with_ref(mut self, ref_type: &str, ref_id: i32) -> Self {
        self.ref_type = Some(ref_type.to_string());
        self.ref_id = Some(ref_id);
        self
    }
}

#[derive(Debug, Clone)]
pub struct AuditLogger {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl AuditLogger {
    /// Starts the writer task. It exits once every logger clone has been dropped
    /// and the queue is drained.
    pub fn spawn(db: Arc<DatabaseConnection>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(db, rx));
        (Self { tx }, handle)
    }

    pub fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.tx.send(entry) {
            warn!(action = %e.0.action, "Audit writer is gone, dropping entry");
        }
    }
}

async fn run_writer(db: Arc<DatabaseConnection>, mut rx: mpsc::UnboundedReceiver<AuditEntry>) {
    while let Some(entry) = rx.recv().await {
        if let Err(e) = write_entry(db.as_ref(), &entry).await {
            warn!(
                category = %entry.category,
                action = %entry.action,
                error = %e,
                "Failed to write audit log entry"
            );
        }
    }
    debug!("Audit writer stopped");
}

/// Inserts one entry directly. Used by the writer task.
pub async fn write_entry<C>(db: &C, entry: &AuditEntry) -> Result<audit_logs::Model, DbErr>
where
    C: ConnectionTrait,
{
    audit_logs::ActiveModel {
        timestamp: ActiveValue::Set(Utc::now()),
        category: ActiveValue::Set(entry.category.clone()),
        action: ActiveValue::Set(entry.action.clone()),
        details: ActiveValue::Set(entry.details.clone()),
        ref_type: ActiveValue::Set(entry.ref_type.clone()),
        ref_id: ActiveValue::Set(entry.ref_id),
        level: ActiveValue::Set(entry.level.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}
