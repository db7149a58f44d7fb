//! # Posting Rules
//!
//! The pure half of the Transaction Poster. The store half lives in
//! `tally_db::posting` and calls into this module in a fixed order:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Step  Rule                                   Where                     │
//! │  ────  ─────────────────────────────────────  ───────────────────────── │
//! │   1    unpaid ⇒ customer required             check_counterparty()      │
//! │   2    customer exists & is owned             store + access::authorize │
//! │   3    category exists, owned, type matches   store + check_category()  │
//! │   4    due date parses                        plan()                    │
//! │   5    CAPITAL / INCOME / EXPENSE shape       plan()                    │
//! │   6    lock products, stock effect, COGS      store + apply_stock()     │
//! │   7    default payment status                 plan()                    │
//! │   8    persist everything or nothing          store                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Category, PaymentStatus, Product, TransactionType};
use crate::MAX_STOCK;
use crate::validation::{
    parse_due_date, validate_amount_limit, validate_item_count, validate_name, validate_price,
    validate_quantity,
};

// =============================================================================
// Request DTOs
// =============================================================================

/// Body of `POST /transactions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Only read for CAPITAL; INCOME/EXPENSE totals are computed.
    #[serde(default)]
    pub total_amount: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub items: Vec<CreateItemRequest>,
}

/// One requested line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub product_id: Option<i64>,
    /// May be blank when `product_id` is set; the product's name is used.
    #[serde(default)]
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

// =============================================================================
// Plan
// =============================================================================

/// A validated transaction ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingPlan {
    pub transaction_type: TransactionType,
    pub total_amount: Money,
    pub notes: Option<String>,
    pub customer_id: Option<i64>,
    pub category_id: Option<i64>,
    pub payment_status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub lines: Vec<PlannedLine>,
}

impl PostingPlan {
    /// Product ids referenced by the lines, ascending and deduplicated.
    ///
    /// This is the lock acquisition order.
    pub fn product_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.lines.iter().filter_map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// A validated line. `purchase_price` is filled in by [`apply_stock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: Option<i64>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub purchase_price: Money,
    pub subtotal: Money,
}

/// Step 1: an unpaid transaction needs somebody who owes or is owed.
pub fn check_counterparty(req: &CreateTransactionRequest) -> CoreResult<()> {
    if req.payment_status == Some(PaymentStatus::Unpaid) && req.customer_id.is_none() {
        return Err(CoreError::CustomerRequired);
    }
    Ok(())
}

/// The requested type, or a validation error when it is missing.
pub fn requested_type(req: &CreateTransactionRequest) -> CoreResult<TransactionType> {
    req.transaction_type.ok_or_else(|| {
        ValidationError::Required {
            field: "type".to_string(),
        }
        .into()
    })
}

/// Step 3 (type half): the category must sit on the same side of the books.
pub fn check_category(category: &Category, transaction_type: TransactionType) -> CoreResult<()> {
    match transaction_type.category_type() {
        None => Err(CoreError::CategoryNotAllowed(transaction_type)),
        Some(expected) if expected != category.category_type => {
            Err(CoreError::CategoryTypeMismatch {
                category_type: category.category_type,
                transaction_type,
            })
        }
        Some(_) => Ok(()),
    }
}

/// Steps 4, 5 and 7: builds the plan from the request.
///
/// ## CAPITAL
/// No items, positive supplied amount, always paid, never due.
///
/// ## INCOME / EXPENSE
/// At least one item; total is the sum of `unit_price × quantity`.
pub fn plan(req: &CreateTransactionRequest) -> CoreResult<PostingPlan> {
    let transaction_type = requested_type(req)?;

    let due_date = parse_due_date(req.due_date.as_deref())?;

    let notes = req
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    if transaction_type == TransactionType::Capital {
        if !req.items.is_empty() {
            return Err(CoreError::CapitalWithItems);
        }
        let amount = req.total_amount.unwrap_or_default();
        if !amount.is_positive() {
            return Err(CoreError::CapitalAmountNotPositive);
        }
        validate_amount_limit("total_amount", amount)?;
        return Ok(PostingPlan {
            transaction_type,
            total_amount: amount,
            notes,
            customer_id: req.customer_id,
            category_id: None,
            payment_status: PaymentStatus::Paid,
            due_date: None,
            lines: Vec::new(),
        });
    }

    if req.items.is_empty() {
        return Err(CoreError::ItemsRequired(transaction_type));
    }
    validate_item_count(req.items.len())?;

    let lines = req
        .items
        .iter()
        .map(plan_line)
        .collect::<CoreResult<Vec<_>>>()?;
    let total_amount = lines
        .iter()
        .try_fold(Money::zero(), |acc, l| acc.checked_add(l.subtotal))
        .filter(Money::within_limit)
        .ok_or_else(|| ValidationError::AmountTooLarge {
            field: "total_amount".to_string(),
            max: Money::MAX,
        })?;

    Ok(PostingPlan {
        transaction_type,
        total_amount,
        notes,
        customer_id: req.customer_id,
        category_id: req.category_id,
        payment_status: req.payment_status.unwrap_or_default(),
        due_date,
        lines,
    })
}

fn plan_line(item: &CreateItemRequest) -> CoreResult<PlannedLine> {
    validate_quantity(item.quantity)?;
    validate_price("unit_price", item.unit_price)?;

    let product_name = item.product_name.trim().to_string();
    if item.product_id.is_none() {
        validate_name("product_name", &product_name)?;
    }

    let subtotal = item
        .unit_price
        .checked_multiply_quantity(item.quantity)
        .filter(Money::within_limit)
        .ok_or_else(|| ValidationError::AmountTooLarge {
            field: "subtotal".to_string(),
            max: Money::MAX,
        })?;

    Ok(PlannedLine {
        product_id: item.product_id,
        product_name,
        quantity: item.quantity,
        unit_price: item.unit_price,
        purchase_price: Money::zero(),
        subtotal,
    })
}

// =============================================================================
// Stock Effects (Step 6)
// =============================================================================

/// Applies every line's stock effect to the locked products.
///
/// `products` holds the rows locked for this posting, keyed by id; their
/// `stock` is updated in place and the caller writes them back. Lines are
/// processed in the order they were submitted, so two lines for the same
/// product draw down the same running stock.
///
/// - INCOME: rejects when `quantity > stock`, otherwise decrements and
///   snapshots the product's purchase price as the line's cost basis.
/// - EXPENSE: increments (a restock); cost basis stays zero.
pub fn apply_stock(
    transaction_type: TransactionType,
    lines: &mut [PlannedLine],
    products: &mut BTreeMap<i64, Product>,
) -> CoreResult<()> {
    for line in lines.iter_mut() {
        let Some(product_id) = line.product_id else {
            continue;
        };
        let product = products
            .get_mut(&product_id)
            .ok_or(CoreError::NotFound {
                entity: "Product",
                id: product_id,
            })?;

        if line.product_name.is_empty() {
            line.product_name = product.name.clone();
        }

        match transaction_type {
            TransactionType::Income => {
                if line.quantity > product.stock {
                    return Err(CoreError::InsufficientStock {
                        product: product.name.clone(),
                        remaining: product.stock,
                        requested: line.quantity,
                    });
                }
                product.stock -= line.quantity;
                line.purchase_price = product.purchase_price;
            }
            TransactionType::Expense => {
                product.stock = product
                    .stock
                    .checked_add(line.quantity)
                    .filter(|stock| *stock <= MAX_STOCK)
                    .ok_or_else(|| ValidationError::OutOfRange {
                        field: "stock".to_string(),
                        min: 0,
                        max: MAX_STOCK,
                    })?;
            }
            TransactionType::Capital => {}
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
