//! # Domain Types
//!
//! Core domain types for Tally bookkeeping.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Domain Model                                     │
//! │                                                                         │
//! │                           ┌─────────┐                                   │
//! │                           │  User   │ owns everything below             │
//! │                           └────┬────┘                                   │
//! │          ┌──────────────┬──────┴───────┬──────────────┐                 │
//! │          ▼              ▼              ▼              ▼                 │
//! │    ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐        │
//! │    │ Product  │   │ Customer │   │ Category │   │ Transaction │        │
//! │    │ stock    │   └────┬─────┘   └────┬─────┘   │ INCOME      │        │
//! │    │ prices   │        │ 0..1         │ 0..1    │ EXPENSE     │        │
//! │    └────┬─────┘        └──────────────┴────────►│ CAPITAL     │        │
//! │         │ 0..1                                   └──────┬──────┘        │
//! │         │                                               │ 1:N           │
//! │         │                                        ┌──────▼──────────┐    │
//! │         └───────────────────────────────────────►│ TransactionItem │    │
//! │                                                  │ name snapshot   │    │
//! │                                                  │ cost snapshot   │    │
//! │                                                  └─────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Handling
//! All monetary values use [`Money`] (integer cents). Never floats.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::access::Owned;
use crate::money::Money;

// =============================================================================
// User
// =============================================================================

/// An account that owns a set of books.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `stock` is never negative; the poster refuses any INCOME line that would
/// take it below zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub stock: i64,
    /// Low-stock alert fires when `stock <= min_stock`.
    pub min_stock: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true when the product is at or below its alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer (for INCOME) or supplier (for EXPENSE).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Category
// =============================================================================

/// Which side of the books a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    Income,
    Expense,
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryType::Income => f.write_str("INCOME"),
            CategoryType::Expense => f.write_str("EXPENSE"),
        }
    }
}

/// A user-defined label for INCOME or EXPENSE transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction Type & Payment Status
// =============================================================================

/// The kind of cash movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Sale. Decrements stock of referenced products.
    Income,
    /// Purchase or cost. Product lines restock.
    Expense,
    /// Owner's cash injection. No items.
    Capital,
}

impl TransactionType {
    /// The category type that may be attached, if any.
    pub fn category_type(&self) -> Option<CategoryType> {
        match self {
            TransactionType::Income => Some(CategoryType::Income),
            TransactionType::Expense => Some(CategoryType::Expense),
            TransactionType::Capital => None,
        }
    }

    /// Whether this type adds to the cash balance.
    pub fn is_credit(&self) -> bool {
        !matches!(self, TransactionType::Expense)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Income => f.write_str("INCOME"),
            TransactionType::Expense => f.write_str("EXPENSE"),
            TransactionType::Capital => f.write_str("CAPITAL"),
        }
    }
}

/// Whether the cash for a transaction has changed hands.
///
/// Wire values follow the books' own vocabulary: `LUNAS` (settled) and
/// `BELUM LUNAS` (outstanding). `PAID`/`UNPAID` are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "LUNAS", alias = "PAID")]
    Paid,
    #[serde(rename = "BELUM LUNAS", alias = "UNPAID")]
    Unpaid,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Paid => f.write_str("LUNAS"),
            PaymentStatus::Unpaid => f.write_str("BELUM LUNAS"),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Customer reference as resolved on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub id: i64,
    pub name: String,
}

/// Category reference as resolved on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

/// A posted transaction with its items and resolved references.
///
/// Immutable once posted, except for `payment_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub total_amount: Money,
    pub notes: Option<String>,
    pub customer_id: Option<i64>,
    pub category_id: Option<i64>,
    pub payment_status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer: Option<CustomerRef>,
    pub category: Option<CategoryRef>,
    pub items: Vec<TransactionItem>,
}

impl Transaction {
    /// Counterparty name, `"General"` when no customer is attached.
    pub fn customer_name(&self) -> &str {
        self.customer
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or(crate::DEFAULT_COUNTERPARTY)
    }

    /// Cost of goods sold carried by this transaction's items.
    pub fn cogs(&self) -> Money {
        self.items.iter().map(TransactionItem::cost).sum()
    }
}

/// One line of a transaction.
///
/// `product_name` and `purchase_price` are snapshots taken at posting time
/// and never follow later edits to the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub id: i64,
    pub transaction_id: i64,
    /// `None` for ad-hoc lines.
    pub product_id: Option<i64>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Cost basis per unit. Zero unless this is an INCOME line tied to a product.
    pub purchase_price: Money,
    pub subtotal: Money,
}

impl TransactionItem {
    /// Cost basis for the whole line.
    pub fn cost(&self) -> Money {
        self.purchase_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Ownership
// =============================================================================

impl Owned for Product {
    const ENTITY: &'static str = "Product";
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Customer {
    const ENTITY: &'static str = "Customer";
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Category {
    const ENTITY: &'static str = "Category";
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Transaction {
    const ENTITY: &'static str = "Transaction";
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Unpaid).unwrap(),
            "\"BELUM LUNAS\""
        );
        let paid: PaymentStatus = serde_json::from_str("\"PAID\"").unwrap();
        assert_eq!(paid, PaymentStatus::Paid);
        let unpaid: PaymentStatus = serde_json::from_str("\"BELUM LUNAS\"").unwrap();
        assert_eq!(unpaid, PaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Paid);
    }

    #[test]
    fn test_transaction_type_category_pairing() {
        assert_eq!(
            TransactionType::Income.category_type(),
            Some(CategoryType::Income)
        );
        assert_eq!(TransactionType::Capital.category_type(), None);
        assert!(TransactionType::Capital.is_credit());
        assert!(!TransactionType::Expense.is_credit());
    }

    #[test]
    fn test_item_cost_uses_snapshot() {
        let item = TransactionItem {
            id: 1,
            transaction_id: 1,
            product_id: Some(3),
            product_name: "Kopi".to_string(),
            quantity: 4,
            unit_price: Money::from_cents(1500),
            purchase_price: Money::from_cents(900),
            subtotal: Money::from_cents(6000),
        };
        assert_eq!(item.cost().cents(), 3600);
    }
}
