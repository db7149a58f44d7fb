//! Registration and login.
//!
//! ```text
//! POST /auth/register ── validate ── argon2 hash ── users.create ── 201 User
//! POST /auth/login    ── get_by_username ── verify ── JWT ── 200 {token, user}
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tally_core::validation::{validate_email, validate_name, validate_password, validate_username};
use tally_core::{CoreError, User};
use tally_db::NewUser;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(req) = payload?;

    let username = req.username.trim();
    let email = req.email.trim();
    let full_name = match req.full_name.trim() {
        "" => username,
        name => name,
    };
    validate_username(username)?;
    validate_email(email)?;
    validate_password(&req.password)?;
    validate_name("full_name", full_name)?;

    let user = state
        .db
        .users()
        .create(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(&req.password)?,
            full_name: full_name.to_string(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload?;

    let user = state.db.users().get_by_username(req.username.trim()).await?;
    let user = match user {
        Some(u) if verify_password(&req.password, &u.password_hash) => u,
        _ => {
            warn!(username = %req.username, "Failed login");
            return Err(CoreError::InvalidCredentials.into());
        }
    };

    let token = state.jwt.generate_token(user.id, &user.username)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}
