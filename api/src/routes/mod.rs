use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod accounts;
pub mod ai;
pub mod audit;
pub mod market;
pub mod system;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/accounts",
            get(accounts::list_accounts)
                .post(accounts::upsert_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route(
            "/ai/train",
            get(ai::list_models)
                .post(ai::start_training)
                .delete(ai::cancel_training),
        )
        .route("/system/status", get(system::current_status))
        .route("/system/toggle", post(system::toggle))
        .route("/mt5/history", get(market::history))
        .route("/audit-logs", get(audit::list_audit_logs));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeTrainingJobs": state.training.pending_jobs(),
    }))
}
