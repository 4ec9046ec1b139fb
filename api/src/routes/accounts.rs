use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use shared::entity::accounts;
use shared::validation::{parse_id, AccountFilter, AccountInput, AccountPatch};
use shared::AuditEntry;
use tracing::{info, warn};

use crate::error::{json_body, query_rejected, ApiError, ApiResult};
use crate::repositories::account_repository::is_unique_violation;
use crate::repositories::AccountRepository;
use crate::state::AppState;

const CATEGORY: &str = "account";

fn describe(account: &accounts::Model) -> String {
    format!("{} @ {} ({})", account.login, account.server, account.broker)
}

/// GET /api/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Json<Vec<accounts::Model>>> {
    let Query(query) = query.map_err(|e| query_rejected("INVALID_QUERY_PARAMS", e))?;
    let filter = AccountFilter::from_query(&query).map_err(ApiError::invalid_query)?;

    let accounts = AccountRepository::new(state.db.clone()).list(&filter).await?;
    Ok(Json(accounts))
}

/// POST /api/accounts: upsert keyed on (broker, server, login).
pub async fn upsert_account(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = json_body(payload)?;
    let input = AccountInput::from_json(&body).map_err(ApiError::validation)?;
    let repo = AccountRepository::new(state.db.clone());

    let existing = match repo.find_by_identity(&input.broker, &input.server, &input.login).await? {
        Some(existing) => existing,
        None => match repo.insert(&input).await {
            Ok(account) => {
                info!(account_id = account.id, "Account created");
                state.audit.record(
                    AuditEntry::info(CATEGORY, "account_created", format!("Created account {}", describe(&account)))
                        .with_ref(CATEGORY, account.id),
                );
                return Ok((
                    StatusCode::CREATED,
                    Json(json!({
                        "success": true,
                        "message": "Account created",
                        "account": account,
                    })),
                ));
            }
            // Lost the race against a concurrent insert of the same identity
            Err(e) if is_unique_violation(&e) => {
                warn!(login = %input.login, "Concurrent account insert, updating instead");
                repo.find_by_identity(&input.broker, &input.server, &input.login)
                    .await?
                    .ok_or(e)?
            }
            Err(e) => return Err(e.into()),
        },
    };

    let account = repo.overwrite(existing, &input).await?;
    info!(account_id = account.id, "Account updated");
    state.audit.record(
        AuditEntry::info(CATEGORY, "account_updated", format!("Updated account {}", describe(&account)))
            .with_ref(CATEGORY, account.id),
    );
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Account updated",
            "account": account,
        })),
    ))
}

/// Field-level differences between two versions of an account, as `(field, old, new)`.
fn changed_fields(before: &accounts::Model, after: &accounts::Model) -> Vec<(&'static str, String, String)> {
    let mut changes = Vec::new();
    let mut compare = |field: &'static str, old: String, new: String| {
        if old != new {
            changes.push((field, old, new));
        }
    };
    compare("broker", before.broker.clone(), after.broker.clone());
    compare("server", before.server.clone(), after.server.clone());
    compare("login", before.login.clone(), after.login.clone());
    compare(
        "alias",
        before.alias.clone().unwrap_or_default(),
        after.alias.clone().unwrap_or_default(),
    );
    compare("balance", before.balance.to_string(), after.balance.to_string());
    compare("equity", before.equity.to_string(), after.equity.to_string());
    compare("marginLevel", before.margin_level.to_string(), after.margin_level.to_string());
    compare("status", before.status.clone(), after.status.clone());
    changes
}

/// PUT /api/accounts?id=
pub async fn update_account(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(|e| query_rejected("INVALID_ID", e))?;
    let id = parse_id(query.get("id")).ok_or_else(ApiError::invalid_id)?;

    let body = json_body(payload)?;
    let patch = AccountPatch::from_json(&body).map_err(ApiError::validation)?;

    let repo = AccountRepository::new(state.db.clone());
    let before = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ACCOUNT_NOT_FOUND", format!("Account {} not found", id)))?;

    let after = match repo.apply_patch(before.clone(), &patch).await {
        Ok(account) => account,
        Err(e) if patch.touches_identity() && is_unique_violation(&e) => {
            return Err(ApiError::conflict(
                "DUPLICATE_ACCOUNT",
                "Another account already uses this broker, server and login",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let changes = changed_fields(&before, &after);
    for (field, old, new) in &changes {
        state.audit.record(
            AuditEntry::info(
                CATEGORY,
                "account_field_updated",
                format!("Account {} {}: '{}' -> '{}'", after.id, field, old, new),
            )
            .with_ref(CATEGORY, after.id),
        );
    }
    let fields: Vec<&str> = changes.iter().map(|(field, _, _)| *field).collect();
    state.audit.record(
        AuditEntry::info(
            CATEGORY,
            "account_updated",
            format!("Updated account {} ({} field(s) changed)", describe(&after), fields.len()),
        )
        .with_ref(CATEGORY, after.id),
    );
    info!(account_id = after.id, changed = ?fields, "Account patched");

    Ok(Json(json!({
        "success": true,
        "message": "Account updated",
        "changedFields": fields,
        "account": after,
    })))
}

/// DELETE /api/accounts?id=
pub async fn delete_account(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(|e| query_rejected("INVALID_ID", e))?;
    let id = parse_id(query.get("id")).ok_or_else(ApiError::invalid_id)?;

    let repo = AccountRepository::new(state.db.clone());
    let account = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ACCOUNT_NOT_FOUND", format!("Account {} not found", id)))?;

    repo.delete(id).await?;
    info!(account_id = id, "Account deleted");
    state.audit.record(
        AuditEntry::info(CATEGORY, "account_deleted", format!("Deleted account {}", describe(&account)))
            .with_ref(CATEGORY, id),
    );

    Ok(Json(json!({
        "success": true,
        "message": "Account deleted",
        "id": id,
    })))
}
