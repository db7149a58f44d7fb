//! # Database Errors
//!
//! Error types for database operations.
//!
//! Business rejections raised inside a posting unit travel as
//! [`DbError::Core`] so that `?` unwinds the unit and the dropped
//! transaction rolls back.

use tally_core::{CoreError, ValidationError};
use thiserror::Error;

/// Store errors. Only [`DbError::Core`] is meant to reach API callers
/// verbatim; the rest are logged and reported as internal.
#[derive(Debug, Error)]
pub enum DbError {
    /// A domain rule, ownership check or conflict rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A UNIQUE index rejected the write. Repositories translate the ones
    /// they expect (SKU, username, email, category name) into `Core`.
    #[error("unique constraint failed on {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns the domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            DbError::Core(e) => Some(e),
            _ => None,
        }
    }

    /// True for UNIQUE index violations.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation(_))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// ```text
/// constraint errors   → UniqueViolation / ForeignKeyViolation
/// other driver errors → QueryFailed
/// PoolTimedOut        → PoolExhausted
/// PoolClosed          → ConnectionFailed
/// everything else     → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                // SQLite: "UNIQUE constraint failed: products.owner_id, products.sku"
                sqlx::error::ErrorKind::UniqueViolation => DbError::UniqueViolation(
                    db_err
                        .message()
                        .rsplit(": ")
                        .next()
                        .unwrap_or("unknown")
                        .to_string(),
                ),
                sqlx::error::ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                _ => DbError::QueryFailed(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
