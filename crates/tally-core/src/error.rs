//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rules, access, not-found, conflicts   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures (+ CoreError)      │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, ids, types)
//! 3. Errors are enum variants matched structurally, never compared as strings
//! 4. Each variant has a stable machine-checkable [`CoreError::reason`]

use thiserror::Error;

use crate::money::Money;
use crate::types::{CategoryType, TransactionType};

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used by outer layers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// A business rule rejected the request.
    BusinessRule,
    /// The entity exists but belongs to somebody else.
    Forbidden,
    /// The entity does not exist (or was soft-deleted).
    NotFound,
    /// The request conflicts with current state.
    Conflict,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations, authorization failures
/// and state conflicts. Every variant aborts the surrounding posting unit.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity cannot be found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Entity exists but is owned by another user.
    #[error("access denied: {entity} {id} does not belong to you")]
    Forbidden { entity: &'static str, id: i64 },

    /// Insufficient stock to complete an INCOME posting.
    ///
    /// ## User Workflow
    /// ```text
    /// Post INCOME (qty: 5)
    ///      │
    ///      ▼
    /// Lock product row: stock=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Kopi Susu", remaining: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole posting rolled back, stock stays 3
    /// ```
    #[error("insufficient stock for product {product}, remaining: {remaining}")]
    InsufficientStock {
        product: String,
        remaining: i64,
        requested: i64,
    },

    /// Category type does not match the transaction type.
    #[error("category type '{category_type}' does not match transaction type '{transaction_type}'")]
    CategoryTypeMismatch {
        category_type: CategoryType,
        transaction_type: TransactionType,
    },

    /// Categories only apply to INCOME and EXPENSE.
    #[error("category cannot be attached to a {0} transaction")]
    CategoryNotAllowed(TransactionType),

    /// An unpaid transaction needs a customer or supplier.
    #[error("a customer/supplier is required for an unpaid transaction")]
    CustomerRequired,

    /// CAPITAL postings carry no items.
    #[error("capital transactions must not have items")]
    CapitalWithItems,

    /// CAPITAL postings need a positive amount.
    #[error("capital transactions must have a total amount greater than zero")]
    CapitalAmountNotPositive,

    /// INCOME/EXPENSE postings need at least one item.
    #[error("{0} transactions must have at least one item")]
    ItemsRequired(TransactionType),

    /// Transaction has already been settled.
    #[error("transaction {0} is already paid")]
    AlreadyPaid(i64),

    /// A category with the same name and type already exists.
    #[error("category '{name}' ({category_type}) already exists")]
    DuplicateCategory {
        name: String,
        category_type: CategoryType,
    },

    /// Entity is still referenced by transactions and cannot be deleted.
    #[error("{entity} {id} is still used by {count} transaction(s)")]
    InUse {
        entity: &'static str,
        id: i64,
        count: i64,
    },

    /// Optimistic lock failed: the row changed since it was read.
    #[error("{entity} {id} was modified concurrently (expected version {expected})")]
    StaleVersion {
        entity: &'static str,
        id: i64,
        expected: i64,
    },

    /// Wrong credentials.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies this error for status-code mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Forbidden { .. } => ErrorKind::Forbidden,
            CoreError::AlreadyPaid(_)
            | CoreError::DuplicateCategory { .. }
            | CoreError::InUse { .. }
            | CoreError::StaleVersion { .. }
            | CoreError::Validation(ValidationError::Duplicate { .. }) => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::InsufficientStock { .. }
            | CoreError::CategoryTypeMismatch { .. }
            | CoreError::CategoryNotAllowed(_)
            | CoreError::CustomerRequired
            | CoreError::CapitalWithItems
            | CoreError::CapitalAmountNotPositive
            | CoreError::ItemsRequired(_)
            | CoreError::InvalidCredentials => ErrorKind::BusinessRule,
        }
    }

    /// Stable machine-checkable reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Forbidden { .. } => "FORBIDDEN",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::CategoryTypeMismatch { .. } => "CATEGORY_TYPE_MISMATCH",
            CoreError::CategoryNotAllowed(_) => "CATEGORY_NOT_ALLOWED",
            CoreError::CustomerRequired => "CUSTOMER_REQUIRED",
            CoreError::CapitalWithItems => "CAPITAL_WITH_ITEMS",
            CoreError::CapitalAmountNotPositive => "CAPITAL_AMOUNT_NOT_POSITIVE",
            CoreError::ItemsRequired(_) => "ITEMS_REQUIRED",
            CoreError::AlreadyPaid(_) => "ALREADY_PAID",
            CoreError::DuplicateCategory { .. } => "DUPLICATE_CATEGORY",
            CoreError::InUse { entity: "Customer", .. } => "CUSTOMER_IN_USE",
            CoreError::InUse { entity: "Category", .. } => "CATEGORY_IN_USE",
            CoreError::InUse { .. } => "IN_USE",
            CoreError::StaleVersion { .. } => "STALE_VERSION",
            CoreError::InvalidCredentials => "INVALID_CREDENTIALS",
            CoreError::Validation(ValidationError::Duplicate { .. }) => "DUPLICATE",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single field failed its rule. Always a 400, except `Duplicate`
/// which the HTTP layer reports as a 409.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Missing, or blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} is longer than {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} needs at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be within {min}..={max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Above [`Money::MAX`], the largest amount the ledger stores.
    #[error("{field} exceeds {max}")]
    AmountTooLarge { field: String, max: Money },

    /// Zero or negative where only positive makes sense (quantity, capital).
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Parses, but not as the expected shape (`YYYY-MM-DD`, e-mail, SKU).
    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Username, e-mail or SKU already taken.
    #[error("{field} '{value}' is already taken")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
