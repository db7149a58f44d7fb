//! # Catalog Inputs
//!
//! Create/update payloads for products, customers and categories, each
//! with a `validate()` that runs before any store access.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::CategoryType;
use crate::validation::{
    validate_email, validate_name, validate_price, validate_sku, validate_stock, ValidationResult,
};

/// Full field set of a product. Updates replace every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: Option<String>,
    pub purchase_price: Money,
    pub selling_price: Money,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
}

impl ProductInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_sku(&self.sku)?;
        validate_price("purchase_price", self.purchase_price)?;
        validate_price("selling_price", self.selling_price)?;
        validate_stock("stock", self.stock)?;
        validate_stock("min_stock", self.min_stock)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CustomerInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        if let Some(email) = blank_to_none(&self.email) {
            validate_email(email)?;
        }
        if let Some(phone) = blank_to_none(&self.phone) {
            if !phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
            {
                return Err(ValidationError::InvalidFormat {
                    field: "phone".to_string(),
                    reason: "must contain only digits, spaces, '+', '-', '(' and ')'".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

impl CategoryInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)
    }
}

/// Trims an optional text field; blank becomes `None`.
pub fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
