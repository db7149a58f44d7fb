//! Customer / supplier CRUD.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::input::CustomerInput;
use tally_core::Customer;

use super::{SearchQuery, Versioned};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CustomerInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let Json(input) = payload?;
    let customer = state.db.customers().create(auth.id, &input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list(auth.id, &query.search).await?))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = path?;
    Ok(Json(state.db.customers().find(auth.id, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Versioned<CustomerInput>>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let customer = state
        .db
        .customers()
        .update(auth.id, id, &body.input, body.version)
        .await?;
    Ok(Json(customer))
}

/// Referenced customers cannot be deleted (409 `CUSTOMER_IN_USE`).
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.db.customers().delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
