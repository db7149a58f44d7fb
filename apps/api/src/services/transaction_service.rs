//! Posting, reading and settling transactions.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tally_core::posting::CreateTransactionRequest;
use tally_core::Transaction;

use super::SearchQuery;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// A transaction as the API shows it: the stored record plus the
/// counterparty label ("General" when no customer is attached).
#[derive(Debug, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub customer_name: String,
}

impl From<Transaction> for TransactionView {
    fn from(transaction: Transaction) -> Self {
        let customer_name = transaction.customer_name().to_string();
        TransactionView {
            transaction,
            customer_name,
        }
    }
}

/// `POST /transactions`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TransactionView>)> {
    let Json(req) = payload?;
    let tx = state.db.poster().post(auth.id, &req).await?;
    Ok((StatusCode::CREATED, Json(tx.into())))
}

/// `GET /transactions?search=`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<TransactionView>>> {
    let txs = state.db.transactions().list(auth.id, &query.search).await?;
    Ok(Json(txs.into_iter().map(TransactionView::from).collect()))
}

/// `GET /transactions/{id}`
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<TransactionView>> {
    let Path(id) = path?;
    let tx = state.db.transactions().find(auth.id, id).await?;
    Ok(Json(tx.into()))
}

/// `PUT /transactions/{id}/paid`
pub async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<TransactionView>> {
    let Path(id) = path?;
    let tx = state.db.transactions().mark_paid(auth.id, id).await?;
    Ok(Json(tx.into()))
}
