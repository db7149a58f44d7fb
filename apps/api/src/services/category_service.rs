//! Category CRUD.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tally_core::input::CategoryInput;
use tally_core::{Category, CategoryType};

use super::Versioned;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let Json(input) = payload?;
    let category = state.db.categories().create(auth.id, &input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /categories?type=INCOME|EXPENSE`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(
        state
            .db
            .categories()
            .list(auth.id, query.category_type)
            .await?,
    ))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Category>> {
    let Path(id) = path?;
    Ok(Json(state.db.categories().find(auth.id, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Versioned<CategoryInput>>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let category = state
        .db
        .categories()
        .update(auth.id, id, &body.input, body.version)
        .await?;
    Ok(Json(category))
}

/// Referenced categories cannot be deleted (409 `CATEGORY_IN_USE`).
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.db.categories().delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
