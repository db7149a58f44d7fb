//! # General Ledger & Unpaid Report
//!
//! Replays transactions in chronological order into a cash book with a
//! running balance, and splits outstanding transactions into receivables
//! and payables.
//!
//! ## Ledger Identity
//! ```text
//! ending_balance == beginning_balance + total_credit - total_debit
//! ```
//! holds for every range because each entry moves the running balance by
//! exactly its credit or debit.
//!
//! ## Cash Direction
//! ```text
//! ┌──────────┬─────────┬────────┐
//! │ Type     │ Credit  │ Debit  │
//! ├──────────┼─────────┼────────┤
//! │ INCOME   │ total   │ 0      │
//! │ CAPITAL  │ total   │ 0      │
//! │ EXPENSE  │ 0       │ total  │
//! └──────────┴─────────┴────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::TransactionType;
use crate::DEFAULT_COUNTERPARTY;

/// Entry timestamp format, e.g. `08 Nov 2024 14:05`.
pub const LEDGER_DATE_FORMAT: &str = "%d %b %Y %H:%M";

/// Flat view of a transaction, enough to describe it in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub transaction_type: TransactionType,
    pub total_amount: Money,
    pub notes: Option<String>,
    pub customer_name: Option<String>,
    /// Product name of the lowest-id item.
    pub first_item: Option<String>,
    pub item_count: i64,
    pub due_date: Option<NaiveDate>,
}

impl TransactionSummary {
    /// Representative label: first item name, or `Transaction <TYPE>`.
    pub fn primary_item(&self) -> String {
        match &self.first_item {
            Some(name) => name.clone(),
            None => format!("Transaction {}", self.transaction_type),
        }
    }

    /// Ledger description.
    ///
    /// `Capital deposit` for CAPITAL, otherwise the first item with an
    /// `(and N more items)` suffix; notes are appended after ` - `.
    pub fn describe(&self) -> String {
        let mut description = match self.transaction_type {
            TransactionType::Capital => "Capital deposit".to_string(),
            _ if self.item_count > 1 => {
                format!("{} (and {} more items)", self.primary_item(), self.item_count - 1)
            }
            _ => self.primary_item(),
        };
        if let Some(notes) = self.notes.as_deref().filter(|n| !n.is_empty()) {
            description.push_str(" - ");
            description.push_str(notes);
        }
        description
    }
}

// =============================================================================
// General Ledger
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction_id: i64,
    pub date: String,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralLedger {
    pub beginning_balance: Money,
    pub entries: Vec<LedgerEntry>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub ending_balance: Money,
}

/// Replays `transactions` on top of `beginning_balance`.
///
/// `transactions` must already be ordered by `(created_at, id)`.
pub fn build_ledger(
    beginning_balance: Money,
    transactions: &[TransactionSummary],
    tz: Tz,
) -> GeneralLedger {
    let mut balance = beginning_balance;
    let mut total_debit = Money::zero();
    let mut total_credit = Money::zero();

    let entries = transactions
        .iter()
        .map(|tx| {
            let (debit, credit) = if tx.transaction_type.is_credit() {
                (Money::zero(), tx.total_amount)
            } else {
                (tx.total_amount, Money::zero())
            };
            balance += credit;
            balance -= debit;
            total_debit += debit;
            total_credit += credit;

            LedgerEntry {
                transaction_id: tx.id,
                date: tx
                    .created_at
                    .with_timezone(&tz)
                    .format(LEDGER_DATE_FORMAT)
                    .to_string(),
                description: tx.describe(),
                debit,
                credit,
                balance,
            }
        })
        .collect();

    GeneralLedger {
        beginning_balance,
        entries,
        total_debit,
        total_credit,
        ending_balance: balance,
    }
}

// =============================================================================
// Unpaid Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpaidItem {
    pub transaction_id: i64,
    pub primary_item: String,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    pub amount: Money,
    pub due_date: Option<NaiveDate>,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpaidReport {
    pub total_receivable: Money,
    pub receivables: Vec<UnpaidItem>,
    pub total_payable: Money,
    pub payables: Vec<UnpaidItem>,
}

/// Splits unpaid transactions into receivables (INCOME) and payables (EXPENSE).
///
/// A line is overdue when its due date is strictly before `today`, the
/// caller's local date.
pub fn build_unpaid_report(unpaid: &[TransactionSummary], today: NaiveDate) -> UnpaidReport {
    let mut report = UnpaidReport {
        total_receivable: Money::zero(),
        receivables: Vec::new(),
        total_payable: Money::zero(),
        payables: Vec::new(),
    };

    for tx in unpaid {
        let item = UnpaidItem {
            transaction_id: tx.id,
            primary_item: tx.primary_item(),
            customer_name: tx
                .customer_name
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTERPARTY.to_string()),
            created_at: tx.created_at,
            amount: tx.total_amount,
            due_date: tx.due_date,
            is_overdue: tx.due_date.is_some_and(|due| due < today),
        };
        match tx.transaction_type {
            TransactionType::Income => {
                report.total_receivable += item.amount;
                report.receivables.push(item);
            }
            TransactionType::Expense => {
                report.total_payable += item.amount;
                report.payables.push(item);
            }
            TransactionType::Capital => {}
        }
    }
    report
}

// =============================================================================
// Unit Tests
// =============================================================================
