//! The signed-in user's own account.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tally_core::validation::{validate_email, validate_name, validate_password};
use tally_core::{CoreError, User, ValidationError};

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

async fn current(state: &AppState, auth: AuthUser) -> ApiResult<User> {
    state
        .db
        .users()
        .get_by_id(auth.id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", auth.id).into())
}

pub async fn get_profile(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(current(&state, auth).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(req) = payload?;
    let full_name = req.full_name.trim();
    let email = req.email.trim();
    validate_name("full_name", full_name)?;
    validate_email(email)?;

    let user = state
        .db
        .users()
        .update_profile(auth.id, full_name, email)
        .await?;
    Ok(Json(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let user = current(&state, auth).await?;

    if !verify_password(&req.old_password, &user.password_hash) {
        return Err(ValidationError::InvalidFormat {
            field: "old_password".to_string(),
            reason: "does not match".to_string(),
        }
        .into());
    }
    validate_password(&req.new_password)?;

    let hash = hash_password(&req.new_password)?;
    state.db.users().update_password(auth.id, &hash).await?;

    Ok(Json(json!({ "message": "password updated" })))
}
