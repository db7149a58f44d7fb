//! # Transaction Poster
//!
//! The only write path for transactions. One call to [`TransactionPoster::post`]
//! is one SQLite write unit: every check, stock movement and insert happens
//! inside it, and any failure rolls the whole unit back.
//!
//! ## Posting Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_counterparty()              unpaid needs a customer              │
//! │  BEGIN IMMEDIATE                   take the write lock up front         │
//! │    ├── customer:  fetch_live + authorize                                │
//! │    ├── category:  fetch_live + authorize + check_category               │
//! │    ├── plan()                      due date, shape, totals, status      │
//! │    ├── products:  fetch_live + authorize, ascending id                  │
//! │    ├── apply_stock()               decrement / restock, COGS snapshot   │
//! │    ├── UPDATE products SET stock                                        │
//! │    ├── INSERT transactions                                              │
//! │    └── INSERT transaction_items                                         │
//! │  COMMIT                            (dropped unit = ROLLBACK)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite has no row locks. `BEGIN IMMEDIATE` takes the database write lock
//! before the first read, so the stock a poster reads is the stock it writes
//! against; a second poster waits on `busy_timeout` and then re-reads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{category, customer, product, transaction};
use crate::time::to_millis;
use tally_core::posting::{
    apply_stock, check_category, check_counterparty, plan, requested_type,
    CreateTransactionRequest,
};
use tally_core::{authorize, Product, Transaction};

/// Posts transactions atomically.
///
/// ## Usage
/// ```rust,ignore
/// let tx = db.poster().post(user.id, &request).await?;
/// assert_eq!(tx.total_amount, tx.items.iter().map(|i| i.subtotal).sum());
/// ```
#[derive(Debug, Clone)]
pub struct TransactionPoster {
    pool: SqlitePool,
}

impl TransactionPoster {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionPoster { pool }
    }

    /// Posts `req` for `owner_id`, stamped with the current time.
    pub async fn post(&self, owner_id: i64, req: &CreateTransactionRequest) -> DbResult<Transaction> {
        self.post_at(owner_id, req, Utc::now()).await
    }

    /// Posts `req` for `owner_id` with an explicit `created_at`.
    ///
    /// ## Errors
    /// Any business-rule failure comes back as [`DbError::Core`]; nothing is
    /// written in that case.
    pub async fn post_at(
        &self,
        owner_id: i64,
        req: &CreateTransactionRequest,
        now: DateTime<Utc>,
    ) -> DbResult<Transaction> {
        check_counterparty(req)?;
        let transaction_type = requested_type(req)?;
        let now_ms = to_millis(now);

        debug!(owner_id, %transaction_type, items = req.items.len(), "Posting transaction");

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        if let Some(customer_id) = req.customer_id {
            let found = customer::fetch_live(&mut *tx, customer_id).await?;
            authorize(found, customer_id, owner_id)?;
        }

        if let Some(category_id) = req.category_id {
            let found = category::fetch_live(&mut *tx, category_id).await?;
            let category = authorize(found, category_id, owner_id)?;
            check_category(&category, transaction_type)?;
        }

        let mut plan = plan(req)?;

        // Ascending id keeps lock order stable across concurrent posters
        let mut products: BTreeMap<i64, Product> = BTreeMap::new();
        for product_id in plan.product_ids() {
            let found = product::fetch_live(&mut *tx, product_id).await?;
            products.insert(product_id, authorize(found, product_id, owner_id)?);
        }

        if let Err(e) = apply_stock(plan.transaction_type, &mut plan.lines, &mut products) {
            warn!(owner_id, error = %e, "Posting rejected");
            return Err(e.into());
        }

        for p in products.values() {
            product::write_stock(&mut *tx, p.id, p.stock, now_ms).await?;
        }

        let transaction_id: i64 = sqlx::query_scalar(
            "INSERT INTO transactions (user_id, transaction_type, total_amount_cents, notes,
                                       customer_id, category_id, payment_status, due_date,
                                       created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             RETURNING id",
        )
        .bind(owner_id)
        .bind(plan.transaction_type)
        .bind(plan.total_amount)
        .bind(plan.notes.as_deref())
        .bind(plan.customer_id)
        .bind(plan.category_id)
        .bind(plan.payment_status)
        .bind(plan.due_date)
        .bind(now_ms)
        .fetch_one(&mut *tx)
        .await?;

        for line in &plan.lines {
            sqlx::query(
                "INSERT INTO transaction_items (transaction_id, product_id, product_name, quantity,
                                                unit_price_cents, purchase_price_cents, subtotal_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(transaction_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.purchase_price)
            .bind(line.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            transaction_id,
            owner_id,
            transaction_type = %plan.transaction_type,
            total = %plan.total_amount,
            items = plan.lines.len(),
            "Transaction posted"
        );

        transaction::fetch(&self.pool, transaction_id)
            .await?
            .ok_or_else(|| DbError::Internal(format!("posted transaction {} vanished", transaction_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::{Database, DbConfig};
    use tally_core::{CategoryType, CoreError, Money, PaymentStatus, TransactionType};

    #[tokio::test]
    async fn test_income_decrements_stock_and_snapshots_cost() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 10, 8_000).await;

        let req = testing::request(
            TransactionType::Income,
            vec![testing::line(Some(kopi.id), "", 3, 15_000)],
        );
        let tx = db.poster().post(owner.id, &req).await.unwrap();

        assert_eq!(tx.total_amount.cents(), 45_000);
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.items[0].purchase_price.cents(), 8_000);
        assert_eq!(tx.cogs().cents(), 24_000);

        let after = db.products().find(owner.id, kopi.id).await.unwrap();
        assert_eq!(after.stock, 7);
        assert_eq!(after.version, kopi.version + 1);

        // Later cost changes never reach the snapshot
        let input = tally_core::input::ProductInput {
            name: after.name.clone(),
            sku: after.sku.clone(),
            description: None,
            purchase_price: Money::from_cents(9_999),
            selling_price: after.selling_price,
            stock: after.stock,
            min_stock: after.min_stock,
        };
        db.products().update(owner.id, kopi.id, &input, after.version).await.unwrap();
        let reread = db.transactions().find(owner.id, tx.id).await.unwrap();
        assert_eq!(reread.items[0].purchase_price.cents(), 8_000);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 3, 8_000).await;

        let req = testing::request(
            TransactionType::Income,
            vec![testing::line(Some(kopi.id), "", 5, 15_000)],
        );
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        match err.as_core() {
            Some(CoreError::InsufficientStock {
                remaining,
                requested,
                ..
            }) => {
                assert_eq!(*remaining, 3);
                assert_eq!(*requested, 5);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        assert_eq!(db.products().find(owner.id, kopi.id).await.unwrap().stock, 3);
        assert!(db.transactions().list(owner.id, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected_without_writes() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;

        let req = testing::request(
            TransactionType::Expense,
            vec![testing::line(None, "Mesin", 1_000, Money::MAX.cents())],
        );
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("VALIDATION_ERROR"));

        let err = db
            .poster()
            .post(owner.id, &testing::capital(Money::MAX.cents() + 1))
            .await
            .unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("VALIDATION_ERROR"));

        assert!(db.transactions().list(owner.id, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restock_past_ceiling_rolls_back() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let gula = testing::product(&db, owner.id, "GULA-1KG", tally_core::MAX_STOCK - 1, 100).await;

        let req = testing::request(
            TransactionType::Expense,
            vec![testing::line(Some(gula.id), "", 5, 100)],
        );
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("VALIDATION_ERROR"));

        let after = db.products().find(owner.id, gula.id).await.unwrap();
        assert_eq!(after.stock, tally_core::MAX_STOCK - 1);
        assert_eq!(after.version, gula.version);
        assert!(db.transactions().list(owner.id, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_lines_share_running_stock() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 5, 100).await;

        let req = testing::request(
            TransactionType::Income,
            vec![
                testing::line(Some(kopi.id), "", 3, 200),
                testing::line(Some(kopi.id), "", 3, 200),
            ],
        );
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("INSUFFICIENT_STOCK"));
        assert_eq!(db.products().find(owner.id, kopi.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_expense_restocks_without_cost_basis() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let beras = testing::product(&db, owner.id, "BERAS-5", 1, 60_000).await;

        let req = testing::request(
            TransactionType::Expense,
            vec![testing::line(Some(beras.id), "Beras 5kg", 4, 58_000)],
        );
        let tx = db.poster().post(owner.id, &req).await.unwrap();

        assert_eq!(tx.items[0].purchase_price, Money::zero());
        assert_eq!(tx.items[0].product_name, "Beras 5kg");
        assert_eq!(db.products().find(owner.id, beras.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_capital_is_paid_and_never_due() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;

        let mut req = testing::capital(5_000_000);
        req.due_date = Some("2030-01-01".to_string());
        req.notes = Some("Setoran awal".to_string());
        let tx = db.poster().post(owner.id, &req).await.unwrap();

        assert_eq!(tx.transaction_type, TransactionType::Capital);
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.due_date, None);
        assert!(tx.items.is_empty());
        assert_eq!(tx.total_amount.cents(), 5_000_000);
    }

    #[tokio::test]
    async fn test_capital_shape_rules() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;

        let err = db.poster().post(owner.id, &testing::capital(0)).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("CAPITAL_AMOUNT_NOT_POSITIVE"));

        let mut with_items = testing::capital(10_000);
        with_items.items = vec![testing::line(None, "Kursi", 1, 10_000)];
        let err = db.poster().post(owner.id, &with_items).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("CAPITAL_WITH_ITEMS"));
    }

    #[tokio::test]
    async fn test_items_required_for_trading_types() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;

        let err = db
            .poster()
            .post(owner.id, &testing::request(TransactionType::Expense, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("ITEMS_REQUIRED"));
    }

    #[tokio::test]
    async fn test_category_must_match_type() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let listrik = testing::category(&db, owner.id, "Listrik", CategoryType::Expense).await;

        let mut req = testing::request(
            TransactionType::Income,
            vec![testing::line(None, "Jasa", 1, 10_000)],
        );
        req.category_id = Some(listrik.id);
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("CATEGORY_TYPE_MISMATCH"));

        let mut capital = testing::capital(10_000);
        capital.category_id = Some(listrik.id);
        let err = db.poster().post(owner.id, &capital).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("CATEGORY_NOT_ALLOWED"));
    }

    #[tokio::test]
    async fn test_unpaid_requires_customer() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;

        let mut req = testing::request(
            TransactionType::Income,
            vec![testing::line(None, "Katering", 1, 10_000)],
        );
        req.payment_status = Some(PaymentStatus::Unpaid);
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("CUSTOMER_REQUIRED"));
    }

    #[tokio::test]
    async fn test_bad_due_date_rejected() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;

        let mut req = testing::request(
            TransactionType::Income,
            vec![testing::line(None, "Katering", 1, 10_000)],
        );
        req.due_date = Some("31/12/2024".to_string());
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.kind()), Some(tally_core::error::ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_foreign_references_forbidden_and_nothing_written() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let other = testing::user(&db, "budi").await;
        let mine = testing::product(&db, owner.id, "KOPI-01", 10, 100).await;
        let theirs = testing::product(&db, other.id, "TEH-01", 10, 100).await;
        let their_customer = testing::customer(&db, other.id, "Bu Ani").await;

        let req = testing::request(
            TransactionType::Income,
            vec![
                testing::line(Some(mine.id), "", 2, 200),
                testing::line(Some(theirs.id), "", 2, 200),
            ],
        );
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { entity: "Product", .. })));
        assert_eq!(db.products().find(owner.id, mine.id).await.unwrap().stock, 10);

        let mut req = testing::request(
            TransactionType::Income,
            vec![testing::line(None, "Jasa", 1, 200)],
        );
        req.customer_id = Some(their_customer.id);
        let err = db.poster().post(owner.id, &req).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { entity: "Customer", .. })));

        let missing = testing::request(
            TransactionType::Income,
            vec![testing::line(Some(9_999), "", 1, 200)],
        );
        let err = db.poster().post(owner.id, &missing).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));

        assert!(db.transactions().list(owner.id, "").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_postings_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("tally.db")).max_connections(4))
            .await
            .unwrap();
        let owner = testing::user(&db, "siti").await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 10, 100).await;

        let req = testing::request(
            TransactionType::Income,
            vec![testing::line(Some(kopi.id), "", 6, 200)],
        );
        let (a, b) = tokio::join!(
            {
                let db = db.clone();
                let req = req.clone();
                tokio::spawn(async move { db.poster().post(owner.id, &req).await })
            },
            {
                let db = db.clone();
                let req = req.clone();
                tokio::spawn(async move { db.poster().post(owner.id, &req).await })
            }
        );
        let results = [a.unwrap(), b.unwrap()];

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        let failed = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(failed.as_core().map(|e| e.reason()), Some("INSUFFICIENT_STOCK"));

        assert_eq!(db.products().find(owner.id, kopi.id).await.unwrap().stock, 4);
        db.close().await;
    }
}
