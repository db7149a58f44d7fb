//! Dashboard aggregates.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use tally_core::report::{ChartData, DashboardStats, LowStockItem};

use super::RangeQuery;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// `GET /dashboard/stats?from&to&tz`
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<DashboardStats>> {
    let range = query.resolve(state.config.timezone, Utc::now());
    Ok(Json(state.db.reports().stats(auth.id, &range).await?))
}

/// `GET /dashboard/chart?from&to&tz`
pub async fn chart(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<ChartData>> {
    let range = query.resolve(state.config.timezone, Utc::now());
    Ok(Json(state.db.reports().chart(auth.id, &range).await?))
}

/// `GET /dashboard/low-stock`
pub async fn low_stock(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<LowStockItem>>> {
    Ok(Json(state.db.reports().low_stock(auth.id).await?))
}
