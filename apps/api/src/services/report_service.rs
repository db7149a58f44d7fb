//! Report endpoints: product performance, general ledger, unpaid.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use tally_core::ledger::{GeneralLedger, UnpaidReport};
use tally_core::report::ProductPerformance;

use super::RangeQuery;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// `GET /reports/product-performance?from&to&tz`
pub async fn product_performance(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<ProductPerformance>>> {
    let range = query.resolve(state.config.timezone, Utc::now());
    Ok(Json(
        state
            .db
            .reports()
            .product_performance(auth.id, &range)
            .await?,
    ))
}

/// `GET /reports/ledger?from&to&tz`
pub async fn ledger(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<GeneralLedger>> {
    let range = query.resolve(state.config.timezone, Utc::now());
    Ok(Json(state.db.reports().ledger(auth.id, &range).await?))
}

/// `GET /reports/unpaid?tz`
///
/// Overdue means a due date strictly before today in the request's zone.
pub async fn unpaid(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<UnpaidReport>> {
    let today = Utc::now()
        .with_timezone(&query.zone(state.config.timezone))
        .date_naive();
    Ok(Json(state.db.reports().unpaid(auth.id, today).await?))
}
