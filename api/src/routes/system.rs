use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use shared::validation::ToggleInput;
use shared::{AuditEntry, SystemStatusView};
use tracing::info;

use crate::error::{json_body, ApiError, ApiResult};
use crate::repositories::SystemStatusRepository;
use crate::state::AppState;

const CATEGORY: &str = "system";

/// GET /api/system/status
pub async fn current_status(State(state): State<AppState>) -> ApiResult<Json<SystemStatusView>> {
    let status = SystemStatusRepository::new(state.db.clone())
        .latest()
        .await?
        .map(SystemStatusView::from)
        .unwrap_or_default();
    Ok(Json(status))
}

fn toggle_action(flag: &str, enabled: bool) -> String {
    format!("{}_{}", flag, if enabled { "activated" } else { "deactivated" })
}

/// POST /api/system/toggle
pub async fn toggle(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(payload)?;
    let input = ToggleInput::from_json(&body).map_err(ApiError::validation)?;
    if input.is_empty() {
        return Err(ApiError::bad_request(
            "NO_UPDATES_PROVIDED",
            "Provide aiActive and/or riskMonitorActive",
        ));
    }

    let repo = SystemStatusRepository::new(state.db.clone());
    let previous = repo.latest().await?.map(SystemStatusView::from).unwrap_or_default();
    let row = repo.append_toggle(&previous, &input).await?;

    let changes = [
        ("ai", previous.ai_active, row.ai_active),
        ("risk_monitor", previous.risk_monitor_active, row.risk_monitor_active),
    ];
    for (flag, before, after) in changes {
        if before != after {
            state.audit.record(
                AuditEntry::info(
                    CATEGORY,
                    &toggle_action(flag, after),
                    format!("{} switched {} -> {}", flag, before, after),
                )
                .with_ref("system_status", row.id),
            );
        }
    }
    state.audit.record(
        AuditEntry::info(
            CATEGORY,
            "system_heartbeat",
            format!("Heartbeat refreshed at {}", row.last_heartbeat.to_rfc3339()),
        )
        .with_ref("system_status", row.id),
    );
    info!(
        status_id = row.id,
        ai_active = row.ai_active,
        risk_monitor_active = row.risk_monitor_active,
        "System toggled"
    );

    Ok(Json(json!({
        "success": true,
        "status": SystemStatusView::from(row),
    })))
}
