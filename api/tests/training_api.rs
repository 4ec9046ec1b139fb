//! HTTP tests for /api/ai/train and the training worker

mod common;

use std::time::Duration;

use chrono::Utc;
use common::{eventually, spawn_app, spawn_app_with, test_db, TestApp};
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait, PaginatorTrait};
use serde_json::{json, Value};
use shared::entity::{ai_models, audit_logs, training_jobs};

fn train_request() -> Value {
    json!({
        "name": "XAU trend",
        "provider": "lstm",
        "version": "1.0.0",
        "symbol": "XAUUSD",
        "timeframe": "1h",
        "hyperparameters": { "epochs": 40 },
    })
}

async fn model_status(app: &TestApp, id: i64) -> String {
    ai_models::Entity::find_by_id(id as i32)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn test_missing_fields_are_reported_separately() {
    let app = &spawn_app().await;

    let (status, body) = app.post("/api/ai/train", &json!({ "name": "only a name" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "MISSING_REQUIRED_FIELDS");

    let mut bad_timeframe = train_request();
    bad_timeframe["timeframe"] = json!("2h");
    let (status, body) = app.post("/api/ai/train", &bad_timeframe).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "timeframe");
}

#[tokio::test]
async fn test_malformed_hyperparameters_are_rejected() {
    let app = &spawn_app().await;
    let mut request = train_request();
    request["hyperparameters"] = json!({ "epochs": "lots" });

    let (status, body) = app.post("/api/ai/train", &request).await;

    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "hyperparameters.epochs");
    assert_eq!(ai_models::Entity::find().count(app.db.as_ref()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_no_history_creates_no_model() {
    let app = &spawn_app().await;

    let (status, body) = app.post("/api/ai/train", &train_request()).await;

    assert_eq!(status, 400);
    assert_eq!(body["code"], "NO_HISTORICAL_DATA");
    assert_eq!(ai_models::Entity::find().count(app.db.as_ref()).await.unwrap(), 0);
    assert_eq!(training_jobs::Entity::find().count(app.db.as_ref()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_training_completes_with_metrics() {
    let app = &spawn_app().await;
    app.seed_bars("XAUUSD", "1h", Utc::now() - chrono::Duration::days(10), 120)
        .await;

    let (status, body) = app.post("/api/ai/train", &train_request()).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "training");
    assert_eq!(body["barsFetched"], 120);
    let model_id = body["modelId"].as_i64().unwrap();

    eventually(|| async move {
        let status = model_status(app, model_id).await;
        (status == "trained").then_some(())
    })
    .await;

    let (_, models) = app.get("/api/ai/train").await;
    let model = &models[0];
    assert_eq!(model["id"].as_i64(), Some(model_id));
    assert_eq!(model["hyperparameters"]["epochs"], 40);
    assert_eq!(model["hyperparameters"]["batchSize"], 32);
    assert_eq!(model["metrics"]["barsUsed"], 120);
    assert_eq!(model["metrics"]["epochs"], 40);
    let accuracy = model["accuracy"].as_f64().unwrap();
    assert!((0.65..=0.92).contains(&accuracy));
    assert!(model["trainingCompletedAt"].is_string());

    let job = training_jobs::Entity::find_by_id(body["jobId"].as_i64().unwrap() as i32)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, "completed");

    let actions = app.wait_for_audit(2).await;
    assert_eq!(actions, vec!["model_training_started", "model_trained"]);
}

#[tokio::test]
async fn test_cancel_stops_pending_training() {
    let app = &spawn_app_with(test_db().await, Duration::from_secs(60)).await;
    app.seed_bars("XAUUSD", "1h", Utc::now() - chrono::Duration::days(2), 24)
        .await;

    let (_, body) = app.post("/api/ai/train", &train_request()).await;
    let model_id = body["modelId"].as_i64().unwrap();
    let job_id = body["jobId"].as_i64().unwrap() as i32;
    eventually(|| async move { (app.state.training.pending_jobs() == 1).then_some(()) }).await;

    let (status, body) = app.delete(&format!("/api/ai/train?id={}", model_id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "failed");
    assert_eq!(model_status(app, model_id).await, "failed");

    let job = training_jobs::Entity::find_by_id(job_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, "cancelled");
    eventually(|| async move { (app.state.training.pending_jobs() == 0).then_some(()) }).await;

    let (status, body) = app.delete(&format!("/api/ai/train?id={}", model_id)).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "TRAINING_NOT_ACTIVE");

    let (status, body) = app.delete("/api/ai/train?id=999").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "MODEL_NOT_FOUND");

    let (status, body) = app.delete("/api/ai/train?id=x").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_ID");
}

#[tokio::test]
async fn test_unfinished_jobs_resume_on_start() {
    let db = test_db().await;
    let now = Utc::now();
    let model = ai_models::ActiveModel {
        name: ActiveValue::Set("EUR range".to_string()),
        provider: ActiveValue::Set("xgboost".to_string()),
        version: ActiveValue::Set("2".to_string()),
        hyperparameters: ActiveValue::Set(json!({ "epochs": 10 }).to_string()),
        status: ActiveValue::Set("training".to_string()),
        accuracy: ActiveValue::Set(None),
        metrics: ActiveValue::Set(None),
        symbol: ActiveValue::Set("EURUSD".to_string()),
        timeframe: ActiveValue::Set("15m".to_string()),
        training_started_at: ActiveValue::Set(Some(now)),
        training_completed_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();
    // Left mid-run by a previous process
    training_jobs::ActiveModel {
        model_id: ActiveValue::Set(model.id),
        symbol: ActiveValue::Set("EURUSD".to_string()),
        timeframe: ActiveValue::Set("15m".to_string()),
        bars_used: ActiveValue::Set(300),
        status: ActiveValue::Set("running".to_string()),
        run_after: ActiveValue::Set(now - chrono::Duration::minutes(1)),
        error: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let app = &spawn_app_with(db, Duration::from_millis(50)).await;
    let model_id = model.id as i64;

    eventually(|| async move {
        let status = model_status(app, model_id).await;
        (status == "trained").then_some(())
    })
    .await;
    let job = training_jobs::Entity::find()
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, "completed");
}

#[tokio::test]
async fn test_failing_job_marks_model_and_job_failed() {
    let db = test_db().await;
    let now = Utc::now();
    let model = ai_models::ActiveModel {
        name: ActiveValue::Set("Broken".to_string()),
        provider: ActiveValue::Set("lstm".to_string()),
        version: ActiveValue::Set("0.1".to_string()),
        hyperparameters: ActiveValue::Set("{not json".to_string()),
        status: ActiveValue::Set("training".to_string()),
        accuracy: ActiveValue::Set(None),
        metrics: ActiveValue::Set(None),
        symbol: ActiveValue::Set("XAUUSD".to_string()),
        timeframe: ActiveValue::Set("1h".to_string()),
        training_started_at: ActiveValue::Set(Some(now)),
        training_completed_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();
    training_jobs::ActiveModel {
        model_id: ActiveValue::Set(model.id),
        symbol: ActiveValue::Set("XAUUSD".to_string()),
        timeframe: ActiveValue::Set("1h".to_string()),
        bars_used: ActiveValue::Set(50),
        status: ActiveValue::Set("queued".to_string()),
        run_after: ActiveValue::Set(now),
        error: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let app = &spawn_app_with(db, Duration::from_millis(50)).await;
    let model_id = model.id as i64;

    eventually(|| async move {
        let status = model_status(app, model_id).await;
        (status == "failed").then_some(())
    })
    .await;
    let job = eventually(|| async move {
        let job = training_jobs::Entity::find().one(app.db.as_ref()).await.unwrap()?;
        (job.status == "failed").then_some(job)
    })
    .await;
    assert!(job.error.unwrap().contains("hyperparameters"));

    let actions = app.wait_for_audit(1).await;
    assert_eq!(actions, vec!["model_training_failed"]);
    let entry = audit_logs::Entity::find().one(app.db.as_ref()).await.unwrap().unwrap();
    assert_eq!(entry.level, "error");
    assert_eq!(entry.ref_id, Some(model.id));
}
