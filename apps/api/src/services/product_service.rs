//! Product CRUD.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::input::ProductInput;
use tally_core::Product;

use super::{SearchQuery, Versioned};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    let product = state.db.products().create(auth.id, &input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products?search=` matches name or SKU.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list(auth.id, &query.search).await?))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = path?;
    Ok(Json(state.db.products().find(auth.id, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Versioned<ProductInput>>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let product = state
        .db
        .products()
        .update(auth.id, id, &body.input, body.version)
        .await?;
    Ok(Json(product))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.db.products().delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
