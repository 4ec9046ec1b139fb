use std::collections::HashMap;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use sea_orm::prelude::*;
use sea_orm::{QueryOrder, QuerySelect};
use shared::entity::price_bars;
use shared::validation::HistoryQuery;
use shared::{HistoricalBar, HistoryResponse};

use crate::error::{query_rejected, ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/mt5/history: the newest `count` bars, oldest first.
pub async fn history(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(query) = query.map_err(|e| query_rejected("INVALID_QUERY_PARAMS", e))?;
    let query = HistoryQuery::from_query(&query).map_err(ApiError::invalid_query)?;

    let mut rows = price_bars::Entity::find()
        .filter(price_bars::Column::Symbol.eq(query.symbol.as_str()))
        .filter(price_bars::Column::Timeframe.eq(query.timeframe.as_str()))
        .order_by_desc(price_bars::Column::Time)
        .limit(query.count)
        .all(state.db.as_ref())
        .await?;
    rows.reverse();

    let bars: Vec<HistoricalBar> = rows.into_iter().map(HistoricalBar::from).collect();
    Ok(Json(HistoryResponse {
        symbol: query.symbol,
        timeframe: query.timeframe,
        count: bars.len(),
        bars,
    }))
}
