use std::collections::HashMap;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use sea_orm::prelude::*;
use sea_orm::{QueryOrder, QuerySelect};
use shared::entity::audit_logs;
use shared::validation::AuditFilter;

use crate::error::{query_rejected, ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Json<Vec<audit_logs::Model>>> {
    let Query(query) = query.map_err(|e| query_rejected("INVALID_QUERY_PARAMS", e))?;
    let filter = AuditFilter::from_query(&query).map_err(ApiError::invalid_query)?;

    let mut select = audit_logs::Entity::find();
    if let Some(category) = &filter.category {
        select = select.filter(audit_logs::Column::Category.eq(category.as_str()));
    }
    if let Some(level) = filter.level {
        select = select.filter(audit_logs::Column::Level.eq(level.as_str()));
    }

    let entries = select
        .order_by_desc(audit_logs::Column::Id)
        .limit(filter.page.limit)
        .offset(filter.page.offset)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(entries))
}
