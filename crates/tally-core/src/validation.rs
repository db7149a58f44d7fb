//! # Validation
//!
//! Field rules run before the store is touched. What they cannot see
//! (ownership, live stock, uniqueness) is checked later:
//!
//! ```text
//!   request body ──serde──► DTO ──validate_*──► plan() ──► BEGIN IMMEDIATE
//!        │                   │                               │
//!   400 malformed      400 field rule                 403/404 gate
//!                                                     422 stock, category
//!                                                     409 UNIQUE index
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("KOPI-250").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_STOCK, MAX_TRANSACTION_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("KOPI-250").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name (product, customer, category, line item).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed.
///
/// Empty is fine and means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a login name: 3-50 characters, letters, digits, `_`, `.`, `-`.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let len = username.chars().count();
    if len == 0 {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }
    if len < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }
    if len > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, '_', '.' and '-'".to_string(),
        });
    }
    Ok(())
}

/// Minimal shape check: one `@` with text on both sides and a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "not an email address".to_string(),
        });
    }
    Ok(())
}

/// Passwords need at least 6 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }
    Ok(())
}

/// Parses an optional `YYYY-MM-DD` due date. Blank means absent.
pub fn parse_due_date(raw: Option<&str>) -> ValidationResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "due_date".to_string(),
                reason: format!("'{}' is not a YYYY-MM-DD date", s),
            }),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price. Zero is allowed (free items).
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Money::MAX.cents(),
        });
    }
    validate_amount_limit(field, price)
}

/// Rejects amounts the ledger cannot store (above [`Money::MAX`]).
pub fn validate_amount_limit(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.within_limit() {
        return Err(ValidationError::AmountTooLarge {
            field: field.to_string(),
            max: Money::MAX,
        });
    }
    Ok(())
}

/// Validates a stock level or threshold: `0..=MAX_STOCK`.
pub fn validate_stock(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }
    Ok(())
}

/// Validates the number of lines on a transaction.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count > MAX_TRANSACTION_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_TRANSACTION_ITEMS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
