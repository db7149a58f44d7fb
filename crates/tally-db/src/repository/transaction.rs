//! # Transaction Repository
//!
//! Read model for posted transactions, plus the one permitted mutation:
//! settling an unpaid transaction.
//!
//! Transactions are written only by [`crate::posting::TransactionPoster`].
//!
//! ## Read Shape
//! ```text
//! transactions t
//!   LEFT JOIN customers  c   → customer {id, name}      (kept after soft delete)
//!   LEFT JOIN categories cat → category {id, name, type}
//!   + transaction_items ordered by id
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{FromRow, Sqlite, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::time::from_millis;
use tally_core::validation::validate_search_query;
use tally_core::{
    authorize, CategoryRef, CategoryType, CoreError, CustomerRef, Money, PaymentStatus,
    Transaction, TransactionItem, TransactionType,
};

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    user_id: i64,
    transaction_type: TransactionType,
    total_amount_cents: Money,
    notes: Option<String>,
    customer_id: Option<i64>,
    category_id: Option<i64>,
    payment_status: PaymentStatus,
    due_date: Option<NaiveDate>,
    created_at: i64,
    updated_at: i64,
    customer_name: Option<String>,
    category_name: Option<String>,
    category_type: Option<CategoryType>,
}

impl TransactionRow {
    fn into_transaction(self, items: Vec<TransactionItem>) -> Transaction {
        let customer = match (self.customer_id, self.customer_name) {
            (Some(id), Some(name)) => Some(CustomerRef { id, name }),
            _ => None,
        };
        let category = match (self.category_id, self.category_name, self.category_type) {
            (Some(id), Some(name), Some(category_type)) => Some(CategoryRef {
                id,
                name,
                category_type,
            }),
            _ => None,
        };
        Transaction {
            id: self.id,
            user_id: self.user_id,
            transaction_type: self.transaction_type,
            total_amount: self.total_amount_cents,
            notes: self.notes,
            customer_id: self.customer_id,
            category_id: self.category_id,
            payment_status: self.payment_status,
            due_date: self.due_date,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
            customer,
            category,
            items,
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    transaction_id: i64,
    product_id: Option<i64>,
    product_name: String,
    quantity: i64,
    unit_price_cents: Money,
    purchase_price_cents: Money,
    subtotal_cents: Money,
}

impl From<ItemRow> for TransactionItem {
    fn from(row: ItemRow) -> Self {
        TransactionItem {
            id: row.id,
            transaction_id: row.transaction_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price_cents,
            purchase_price: row.purchase_price_cents,
            subtotal: row.subtotal_cents,
        }
    }
}

const TRANSACTION_SELECT: &str = "SELECT t.id, t.user_id, t.transaction_type, t.total_amount_cents,
            t.notes, t.customer_id, t.category_id, t.payment_status, t.due_date,
            t.created_at, t.updated_at,
            c.name AS customer_name, cat.name AS category_name, cat.category_type AS category_type
     FROM transactions t
     LEFT JOIN customers c ON c.id = t.customer_id
     LEFT JOIN categories cat ON cat.id = t.category_id";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, product_name, quantity, \
     unit_price_cents, purchase_price_cents, subtotal_cents";

/// Loads one transaction with items and references on any executor.
pub(crate) async fn fetch<'c, C>(conn: C, id: i64) -> DbResult<Option<Transaction>>
where
    C: sqlx::Acquire<'c, Database = Sqlite>,
{
    let mut conn = conn.acquire().await?;

    let row = sqlx::query_as::<_, TransactionRow>(&format!("{TRANSACTION_SELECT} WHERE t.id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 ORDER BY id"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(
        row.into_transaction(items.into_iter().map(TransactionItem::from).collect()),
    ))
}

/// Owner scope plus search, shared by the list and its item fetch.
/// Expects `t` and `c` in scope and binds `?1` owner, `?2` search.
const LIST_FILTER: &str = "WHERE t.user_id = ?1
       AND (?2 = ''
            OR t.notes LIKE '%' || ?2 || '%'
            OR c.name LIKE '%' || ?2 || '%'
            OR EXISTS (SELECT 1 FROM transaction_items ti
                       WHERE ti.transaction_id = t.id
                         AND ti.product_name LIKE '%' || ?2 || '%'))";

/// Items of every transaction the list filter matches, grouped by parent.
///
/// The ids come from a subquery rather than bound parameters, so the
/// statement stays at two variables however long the history grows.
async fn fetch_items_for<'e, E>(
    executor: E,
    owner_id: i64,
    search: &str,
) -> DbResult<HashMap<i64, Vec<TransactionItem>>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM transaction_items
         WHERE transaction_id IN (
             SELECT t.id FROM transactions t
             LEFT JOIN customers c ON c.id = t.customer_id
             {LIST_FILTER})
         ORDER BY id"
    ))
    .bind(owner_id)
    .bind(search)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<i64, Vec<TransactionItem>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.transaction_id)
            .or_default()
            .push(row.into());
    }
    Ok(grouped)
}

/// Repository for the transaction read model.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by id, regardless of owner.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Transaction>> {
        fetch(&self.pool, id).await
    }

    /// Gets a transaction through the ownership gate.
    pub async fn find(&self, owner_id: i64, id: i64) -> DbResult<Transaction> {
        let tx = self.get_by_id(id).await?;
        Ok(authorize(tx, id, owner_id)?)
    }

    /// Lists the owner's transactions, newest first.
    ///
    /// `search` matches item names, the customer name, or notes.
    pub async fn list(&self, owner_id: i64, search: &str) -> DbResult<Vec<Transaction>> {
        let search = validate_search_query(search)?;
        debug!(owner_id, search = %search, "Listing transactions");

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{TRANSACTION_SELECT}
             {LIST_FILTER}
             ORDER BY t.created_at DESC, t.id DESC"
        ))
        .bind(owner_id)
        .bind(&search)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let mut items = fetch_items_for(&self.pool, owner_id, &search).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_transaction(lines)
            })
            .collect())
    }

    /// Settles an unpaid transaction. Touches nothing but the status.
    ///
    /// ## Errors
    /// - `NotFound` / `Forbidden` from the ownership gate
    /// - `AlreadyPaid` when it is already settled
    pub async fn mark_paid(&self, owner_id: i64, id: i64) -> DbResult<Transaction> {
        let tx = self.find(owner_id, id).await?;
        if tx.payment_status.is_paid() {
            return Err(CoreError::AlreadyPaid(id).into());
        }

        // The status guard makes a concurrent second settle lose cleanly.
        let result = sqlx::query(
            "UPDATE transactions SET payment_status = ?2
             WHERE id = ?1 AND payment_status = ?3",
        )
        .bind(id)
        .bind(PaymentStatus::Paid)
        .bind(PaymentStatus::Unpaid)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::AlreadyPaid(id).into());
        }

        info!(transaction_id = id, owner_id, "Transaction marked paid");
        self.find(owner_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_read_model_resolves_references() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let customer = testing::customer(&db, owner.id, "Pak Budi").await;
        let sales = testing::category(&db, owner.id, "Penjualan", CategoryType::Income).await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 10, 8_000).await;

        let mut req = testing::request(
            TransactionType::Income,
            vec![
                testing::line(Some(kopi.id), "", 2, 15_000),
                testing::line(None, "Ongkir", 1, 5_000),
            ],
        );
        req.customer_id = Some(customer.id);
        req.category_id = Some(sales.id);
        let posted = db.poster().post(owner.id, &req).await.unwrap();

        let tx = db.transactions().find(owner.id, posted.id).await.unwrap();
        assert_eq!(tx.customer.as_ref().map(|c| c.name.as_str()), Some("Pak Budi"));
        assert_eq!(tx.category.as_ref().map(|c| c.category_type), Some(CategoryType::Income));
        assert_eq!(tx.items.len(), 2);
        assert_eq!(tx.items[0].product_name, "Product KOPI-01");
        assert_eq!(tx.total_amount.cents(), 35_000);
    }

    #[tokio::test]
    async fn test_list_search_and_owner_scope() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let other = testing::user(&db, "budi").await;

        let mut req = testing::request(
            TransactionType::Expense,
            vec![testing::line(None, "Token listrik", 1, 200_000)],
        );
        req.notes = Some("bulan November".to_string());
        db.poster().post(owner.id, &req).await.unwrap();
        db.poster()
            .post(
                owner.id,
                &testing::request(TransactionType::Income, vec![testing::line(None, "Jasa cuci", 1, 50_000)]),
            )
            .await
            .unwrap();
        db.poster().post(other.id, &testing::capital(1_000_000)).await.unwrap();

        let all = db.transactions().list(owner.id, "").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|t| t.user_id == owner.id));
        assert!(all.iter().all(|t| !t.items.is_empty()));

        let by_item = db.transactions().list(owner.id, "listrik").await.unwrap();
        assert_eq!(by_item.len(), 1);
        let by_notes = db.transactions().list(owner.id, "november").await.unwrap();
        assert_eq!(by_notes.len(), 1);
        assert!(db.transactions().list(owner.id, "zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_paid_once() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let customer = testing::customer(&db, owner.id, "Pak Budi").await;

        let mut req = testing::request(
            TransactionType::Income,
            vec![testing::line(None, "Katering", 1, 750_000)],
        );
        req.customer_id = Some(customer.id);
        req.payment_status = Some(PaymentStatus::Unpaid);
        let posted = db.poster().post(owner.id, &req).await.unwrap();

        let settled = db.transactions().mark_paid(owner.id, posted.id).await.unwrap();
        assert_eq!(settled.payment_status, PaymentStatus::Paid);
        assert_eq!(settled.total_amount, posted.total_amount);
        assert_eq!(settled.items, posted.items);
        assert_eq!(settled.updated_at, posted.updated_at);

        let err = db.transactions().mark_paid(owner.id, posted.id).await.unwrap_err();
        assert_eq!(err.as_core().map(|e| e.reason()), Some("ALREADY_PAID"));
    }

    #[tokio::test]
    async fn test_mark_paid_respects_owner() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let other = testing::user(&db, "budi").await;
        let posted = db.poster().post(owner.id, &testing::capital(10_000)).await.unwrap();

        let err = db.transactions().mark_paid(other.id, posted.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));
        let err = db.transactions().mark_paid(owner.id, 9_999).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_past_sqlite_variable_limit() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let other = testing::user(&db, "budi").await;

        // More rows than SQLite allows bound variables in one statement.
        const HISTORY: i64 = 33_000;
        for user_id in [owner.id, other.id] {
            sqlx::query(
                "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < ?2)
                 INSERT INTO transactions
                     (user_id, transaction_type, total_amount_cents, notes, payment_status,
                      created_at, updated_at)
                 SELECT ?1, 'INCOME', 1000, 'nota ' || n, 'PAID', n, n FROM seq",
            )
            .bind(user_id)
            .bind(HISTORY)
            .execute(db.pool())
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO transaction_items
                 (transaction_id, product_name, quantity, unit_price_cents, subtotal_cents)
             SELECT id, 'Jasa', 1, 1000, 1000 FROM transactions",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let all = db.transactions().list(owner.id, "").await.unwrap();
        assert_eq!(all.len() as i64, HISTORY);
        assert!(all.iter().all(|t| t.user_id == owner.id && t.items.len() == 1));
        assert!(all.iter().all(|t| t.items[0].transaction_id == t.id));

        let narrowed = db.transactions().list(owner.id, "nota 3299").await.unwrap();
        assert_eq!(narrowed.len(), 11);
        assert!(narrowed.iter().all(|t| t.items.len() == 1));
    }
}
