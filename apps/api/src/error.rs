//! Error types for the HTTP API.
//!
//! Every failure leaves a handler as [`ApiError`] and is rendered as
//!
//! ```text
//! HTTP 422
//! { "code": "INSUFFICIENT_STOCK", "error": "insufficient stock for product Kopi, remaining: 3" }
//! ```
//!
//! | Source                         | Status |
//! |--------------------------------|--------|
//! | malformed input / validation   | 400    |
//! | missing or bad token           | 401    |
//! | another owner's entity         | 403    |
//! | missing entity                 | 404    |
//! | duplicate / in use / paid      | 409    |
//! | business rule                  | 422    |
//! | store failure                  | 500    |

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::error::ErrorKind;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Business, authorization, not-found or conflict error from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Request could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Store or infrastructure failure. Details are logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    error: String,
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // Wrong credentials are an auth failure on the wire
            ApiError::Core(CoreError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Core(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::BusinessRule => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(e) => e.reason(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => ApiError::Core(core),
            DbError::UniqueViolation(columns) => ApiError::Core(
                ValidationError::Duplicate {
                    field: columns,
                    value: String::new(),
                }
                .into(),
            ),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Core(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// A non-numeric id in the URL gets the JSON error body, not axum's plain text.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            code: self.code(),
            error: message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
