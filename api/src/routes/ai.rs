use std::collections::HashMap;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use sea_orm::TransactionTrait;
use serde::Serialize;
use serde_json::{json, Value};
use shared::entity::ai_models;
use shared::validation::{parse_id, TrainRequest};
use shared::{AuditEntry, Hyperparameters};
use tracing::info;

use crate::error::{json_body, query_rejected, ApiError, ApiResult};
use crate::repositories::ModelRepository;
use crate::state::AppState;

const CATEGORY: &str = "model";

/// A model row with its JSON columns expanded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelView {
    pub id: i32,
    pub name: String,
    pub provider: String,
    pub version: String,
    pub hyperparameters: Value,
    pub status: String,
    pub accuracy: Option<f64>,
    pub metrics: Option<Value>,
    pub symbol: String,
    pub timeframe: String,
    pub training_started_at: Option<DateTime<Utc>>,
    pub training_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Rows written outside this service may hold non-JSON text; show it verbatim.
fn parse_json_column(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl From<ai_models::Model> for ModelView {
    fn from(model: ai_models::Model) -> Self {
        ModelView {
            id: model.id,
            name: model.name,
            provider: model.provider,
            version: model.version,
            hyperparameters: parse_json_column(&model.hyperparameters),
            status: model.status,
            accuracy: model.accuracy,
            metrics: model.metrics.as_deref().map(parse_json_column),
            symbol: model.symbol,
            timeframe: model.timeframe,
            training_started_at: model.training_started_at,
            training_completed_at: model.training_completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// GET /api/ai/train
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<Vec<ModelView>>> {
    let models = ModelRepository::new(state.db.clone()).list_all().await?;
    Ok(Json(models.into_iter().map(ModelView::from).collect()))
}

/// POST /api/ai/train
pub async fn start_training(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload)?;
    let request = TrainRequest::from_json(&body).map_err(|errors| {
        if errors.has_missing() {
            ApiError::invalid("MISSING_REQUIRED_FIELDS", "Missing required fields", errors)
        } else {
            ApiError::validation(errors)
        }
    })?;

    let hyperparameters = Hyperparameters::default().merged_with(request.hyperparameters.as_ref());

    let bars = state
        .market
        .history(&request.symbol, request.timeframe, state.config.history_bar_count)
        .await
        .context("Failed to fetch historical data")?;
    if bars.is_empty() {
        return Err(ApiError::bad_request(
            "NO_HISTORICAL_DATA",
            format!("No historical data available for {} {}", request.symbol, request.timeframe),
        ));
    }

    let txn = state.db.begin().await?;
    let model = ModelRepository::insert_training(&txn, &request, &hyperparameters).await?;
    let job = state.training.create_job(&txn, &model, bars.len()).await?;
    txn.commit().await?;
    state.training.enqueue(job.id);

    info!(model_id = model.id, job_id = job.id, bars = bars.len(), "Training scheduled");
    state.audit.record(
        AuditEntry::info(
            CATEGORY,
            "model_training_started",
            format!(
                "Training {} {} ({}) on {} {} bars of {}",
                model.name,
                model.version,
                model.provider,
                bars.len(),
                model.timeframe,
                model.symbol
            ),
        )
        .with_ref(CATEGORY, model.id),
    );

    Ok(Json(json!({
        "success": true,
        "modelId": model.id,
        "jobId": job.id,
        "status": model.status,
        "barsFetched": bars.len(),
        "message": "Training started",
    })))
}

/// DELETE /api/ai/train?id=
pub async fn cancel_training(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(|e| query_rejected("INVALID_ID", e))?;
    let id = parse_id(query.get("id")).ok_or_else(ApiError::invalid_id)?;

    let model = ModelRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("MODEL_NOT_FOUND", format!("Model {} not found", id)))?;

    if !state.training.cancel(model.id).await? {
        return Err(ApiError::conflict(
            "TRAINING_NOT_ACTIVE",
            format!("Model {} is not training (status: {})", model.id, model.status),
        ));
    }

    state.audit.record(
        AuditEntry::info(CATEGORY, "model_training_cancelled", format!("Cancelled training of {}", model.name))
            .with_ref(CATEGORY, model.id),
    );

    Ok(Json(json!({
        "success": true,
        "modelId": model.id,
        "status": "failed",
        "message": "Training cancelled",
    })))
}
