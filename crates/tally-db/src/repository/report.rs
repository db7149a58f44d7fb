//! # Report Repository
//!
//! Read-only aggregate queries behind the dashboard and reports. SQL does
//! the filtering and summing; `tally_core::report` and `tally_core::ledger`
//! turn the rows into the shapes callers see.
//!
//! None of these run inside a transaction: a report may see a posting that
//! committed while it was reading. That is fine for reporting and cannot
//! affect posting atomicity.
//!
//! ```text
//! ┌──────────────────────┬────────────────────────────────────────────────┐
//! │ Report               │ Source rows                                    │
//! ├──────────────────────┼────────────────────────────────────────────────┤
//! │ stats                │ SUM/COUNT over transactions + item COGS        │
//! │ chart                │ one sample per INCOME/EXPENSE transaction      │
//! │ low_stock            │ products WHERE stock <= min_stock              │
//! │ product_performance  │ INCOME item lines                              │
//! │ ledger               │ balance before `from` + summaries in range     │
//! │ unpaid               │ UNPAID INCOME/EXPENSE summaries, all time      │
//! └──────────────────────┴────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::product::fetch_low_stock;
use crate::error::DbResult;
use crate::time::{from_millis, to_millis};
use tally_core::ledger::{build_ledger, build_unpaid_report, GeneralLedger, TransactionSummary, UnpaidReport};
use tally_core::range::DateRange;
use tally_core::report::{
    build_chart, low_stock, product_performance, ChartData, ChartSample, DashboardStats,
    LowStockItem, ProductPerformance, SoldLine,
};
use tally_core::{Money, PaymentStatus, TransactionType};

#[derive(Debug, FromRow)]
struct ChartRow {
    created_at: i64,
    transaction_type: TransactionType,
    total_amount_cents: Money,
    cogs_cents: i64,
}

#[derive(Debug, FromRow)]
struct SoldLineRow {
    product_id: Option<i64>,
    product_name: String,
    quantity: i64,
    unit_price_cents: Money,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: i64,
    created_at: i64,
    transaction_type: TransactionType,
    total_amount_cents: Money,
    notes: Option<String>,
    customer_name: Option<String>,
    first_item: Option<String>,
    item_count: i64,
    due_date: Option<NaiveDate>,
}

impl From<SummaryRow> for TransactionSummary {
    fn from(row: SummaryRow) -> Self {
        TransactionSummary {
            id: row.id,
            created_at: from_millis(row.created_at),
            transaction_type: row.transaction_type,
            total_amount: row.total_amount_cents,
            notes: row.notes,
            customer_name: row.customer_name,
            first_item: row.first_item,
            item_count: row.item_count,
            due_date: row.due_date,
        }
    }
}

const SUMMARY_SELECT: &str = "SELECT t.id, t.created_at, t.transaction_type, t.total_amount_cents,
            t.notes, c.name AS customer_name,
            (SELECT ti.product_name FROM transaction_items ti
              WHERE ti.transaction_id = t.id ORDER BY ti.id LIMIT 1) AS first_item,
            (SELECT COUNT(*) FROM transaction_items ti
              WHERE ti.transaction_id = t.id) AS item_count,
            t.due_date
     FROM transactions t
     LEFT JOIN customers c ON c.id = t.customer_id";

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Revenue, COGS, expense and trading-transaction count in range.
    pub async fn stats(&self, owner_id: i64, range: &DateRange) -> DbResult<DashboardStats> {
        let (from, to) = bounds(range);
        debug!(owner_id, from, to, "Computing dashboard stats");

        let (revenue, expense, count): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'INCOME' THEN total_amount_cents END), 0),
                COALESCE(SUM(CASE WHEN transaction_type = 'EXPENSE' THEN total_amount_cents END), 0),
                COUNT(CASE WHEN transaction_type IN ('INCOME', 'EXPENSE') THEN 1 END)
             FROM transactions
             WHERE user_id = ?1 AND created_at BETWEEN ?2 AND ?3",
        )
        .bind(owner_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let cogs: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(ti.purchase_price_cents * ti.quantity), 0)
             FROM transaction_items ti
             JOIN transactions t ON t.id = ti.transaction_id
             WHERE t.user_id = ?1 AND t.transaction_type = 'INCOME'
               AND t.created_at BETWEEN ?2 AND ?3",
        )
        .bind(owner_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats::new(
            Money::from_cents(revenue),
            Money::from_cents(cogs),
            Money::from_cents(expense),
            count,
        ))
    }

    /// Daily revenue / gross profit / expense, one point per local day.
    pub async fn chart(&self, owner_id: i64, range: &DateRange) -> DbResult<ChartData> {
        let (from, to) = bounds(range);

        let rows = sqlx::query_as::<_, ChartRow>(
            "SELECT t.created_at, t.transaction_type, t.total_amount_cents,
                    COALESCE((SELECT SUM(ti.purchase_price_cents * ti.quantity)
                                FROM transaction_items ti
                               WHERE ti.transaction_id = t.id), 0) AS cogs_cents
             FROM transactions t
             WHERE t.user_id = ?1 AND t.transaction_type IN ('INCOME', 'EXPENSE')
               AND t.created_at BETWEEN ?2 AND ?3",
        )
        .bind(owner_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let samples: Vec<ChartSample> = rows
            .into_iter()
            .map(|row| ChartSample {
                created_at: from_millis(row.created_at),
                transaction_type: row.transaction_type,
                amount: row.total_amount_cents,
                cogs: Money::from_cents(row.cogs_cents),
            })
            .collect();

        Ok(build_chart(range, &samples))
    }

    /// Live products at or below their minimum stock.
    pub async fn low_stock(&self, owner_id: i64) -> DbResult<Vec<LowStockItem>> {
        let products = fetch_low_stock(&self.pool, owner_id).await?;
        Ok(low_stock(&products))
    }

    /// INCOME lines in range grouped by product, best sellers first.
    pub async fn product_performance(
        &self,
        owner_id: i64,
        range: &DateRange,
    ) -> DbResult<Vec<ProductPerformance>> {
        let (from, to) = bounds(range);

        let rows = sqlx::query_as::<_, SoldLineRow>(
            "SELECT ti.product_id, ti.product_name, ti.quantity, ti.unit_price_cents
             FROM transaction_items ti
             JOIN transactions t ON t.id = ti.transaction_id
             WHERE t.user_id = ?1 AND t.transaction_type = 'INCOME'
               AND t.created_at BETWEEN ?2 AND ?3
             ORDER BY t.created_at DESC, ti.id DESC",
        )
        .bind(owner_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let lines: Vec<SoldLine> = rows
            .into_iter()
            .map(|row| SoldLine {
                product_id: row.product_id,
                product_name: row.product_name,
                quantity: row.quantity,
                unit_price: row.unit_price_cents,
            })
            .collect();

        Ok(product_performance(&lines))
    }

    /// Cash book for the range with a running balance.
    pub async fn ledger(&self, owner_id: i64, range: &DateRange) -> DbResult<GeneralLedger> {
        let (from, to) = bounds(range);
        debug!(owner_id, from, to, "Building general ledger");

        let beginning: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(CASE WHEN transaction_type = 'EXPENSE'
                                      THEN -total_amount_cents
                                      ELSE total_amount_cents END), 0)
             FROM transactions
             WHERE user_id = ?1 AND created_at < ?2",
        )
        .bind(owner_id)
        .bind(from)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT}
             WHERE t.user_id = ?1 AND t.created_at BETWEEN ?2 AND ?3
             ORDER BY t.created_at ASC, t.id ASC"
        ))
        .bind(owner_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let summaries: Vec<TransactionSummary> = rows.into_iter().map(Into::into).collect();
        Ok(build_ledger(
            Money::from_cents(beginning),
            &summaries,
            range.tz,
        ))
    }

    /// Every unpaid INCOME (receivable) and EXPENSE (payable).
    ///
    /// `today` is the caller's local date for overdue detection.
    pub async fn unpaid(&self, owner_id: i64, today: NaiveDate) -> DbResult<UnpaidReport> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT}
             WHERE t.user_id = ?1 AND t.payment_status = ?2
               AND t.transaction_type IN ('INCOME', 'EXPENSE')
             ORDER BY t.created_at ASC, t.id ASC"
        ))
        .bind(owner_id)
        .bind(PaymentStatus::Unpaid)
        .fetch_all(&self.pool)
        .await?;

        let summaries: Vec<TransactionSummary> = rows.into_iter().map(Into::into).collect();
        Ok(build_unpaid_report(&summaries, today))
    }
}

fn bounds(range: &DateRange) -> (i64, i64) {
    (to_millis(range.from), to_millis(range.to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::{DateTime, Duration, Utc};
    use tally_core::CategoryType;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn range(from: &str, to: &str) -> DateRange {
        DateRange {
            from: utc(from),
            to: utc(to),
            tz: chrono_tz::UTC,
        }
    }

    #[tokio::test]
    async fn test_stats_excludes_capital_and_uses_cost_snapshot() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 10, 8_000).await;
        let at = utc("2024-11-08T09:00:00Z");

        db.poster().post_at(owner.id, &testing::capital(1_000_000), at).await.unwrap();
        db.poster()
            .post_at(
                owner.id,
                &testing::request(TransactionType::Income, vec![testing::line(Some(kopi.id), "", 3, 15_000)]),
                at,
            )
            .await
            .unwrap();
        db.poster()
            .post_at(
                owner.id,
                &testing::request(TransactionType::Expense, vec![testing::line(None, "Gas", 1, 5_000)]),
                at,
            )
            .await
            .unwrap();

        let stats = db
            .reports()
            .stats(owner.id, &range("2024-11-01T00:00:00Z", "2024-11-30T23:59:59Z"))
            .await
            .unwrap();

        assert_eq!(stats.total_revenue.cents(), 45_000);
        assert_eq!(stats.total_cogs.cents(), 24_000);
        assert_eq!(stats.gross_profit.cents(), 21_000);
        assert_eq!(stats.total_expense.cents(), 5_000);
        assert_eq!(stats.net_profit.cents(), 16_000);
        assert_eq!(stats.transaction_count, 2);
    }

    #[tokio::test]
    async fn test_chart_is_gap_filled() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        db.poster()
            .post_at(
                owner.id,
                &testing::request(TransactionType::Income, vec![testing::line(None, "Jasa", 1, 10_000)]),
                utc("2024-11-03T10:00:00Z"),
            )
            .await
            .unwrap();

        let chart = db
            .reports()
            .chart(owner.id, &range("2024-11-01T00:00:00Z", "2024-11-07T23:59:59Z"))
            .await
            .unwrap();

        assert_eq!(chart.len(), 7);
        assert_eq!(chart.labels[2], "03 Nov");
        assert_eq!(chart.revenue_data[2].cents(), 10_000);
        assert_eq!(
            chart.revenue_data.iter().filter(|m| m.is_zero()).count(),
            6
        );
    }

    #[tokio::test]
    async fn test_low_stock_threshold_inclusive() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        // fixture min_stock is 2
        testing::product(&db, owner.id, "AT-LIMIT", 2, 100).await;
        testing::product(&db, owner.id, "EMPTY", 0, 100).await;
        testing::product(&db, owner.id, "PLENTY", 3, 100).await;

        let low = db.reports().low_stock(owner.id).await.unwrap();
        let skus: Vec<&str> = low.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["EMPTY", "AT-LIMIT"]);
    }

    #[tokio::test]
    async fn test_product_performance_in_range() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let kopi = testing::product(&db, owner.id, "KOPI-01", 50, 100).await;
        let at = utc("2024-11-08T09:00:00Z");

        let sale = |qty| {
            testing::request(
                TransactionType::Income,
                vec![testing::line(Some(kopi.id), "Kopi", qty, 1_500), testing::line(None, "Ongkir", 1, 9_000)],
            )
        };
        db.poster().post_at(owner.id, &sale(2), at).await.unwrap();
        db.poster().post_at(owner.id, &sale(4), at).await.unwrap();
        // Out of range
        db.poster().post_at(owner.id, &sale(10), at - Duration::days(30)).await.unwrap();

        let perf = db
            .reports()
            .product_performance(owner.id, &range("2024-11-01T00:00:00Z", "2024-11-30T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(perf.len(), 2);
        assert_eq!(perf[0].product_name, "Ongkir");
        assert_eq!(perf[0].total_revenue.cents(), 18_000);
        assert_eq!(perf[1].product_id, Some(kopi.id));
        assert_eq!(perf[1].total_sold, 6);
        assert_eq!(perf[1].total_revenue.cents(), 9_000);
    }

    #[tokio::test]
    async fn test_ledger_beginning_balance_and_order() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let day = utc("2024-11-08T09:00:00Z");

        // Before the range: +1000 capital, -250 expense
        db.poster().post_at(owner.id, &testing::capital(100_000), day - Duration::days(10)).await.unwrap();
        db.poster()
            .post_at(
                owner.id,
                &testing::request(TransactionType::Expense, vec![testing::line(None, "Sewa", 1, 25_000)]),
                day - Duration::days(9),
            )
            .await
            .unwrap();

        // In range, same timestamp: id breaks the tie
        db.poster()
            .post_at(
                owner.id,
                &testing::request(TransactionType::Income, vec![testing::line(None, "Jasa", 1, 50_000)]),
                day,
            )
            .await
            .unwrap();
        db.poster()
            .post_at(
                owner.id,
                &testing::request(TransactionType::Expense, vec![testing::line(None, "Gas", 1, 20_000)]),
                day,
            )
            .await
            .unwrap();

        let ledger = db
            .reports()
            .ledger(owner.id, &range("2024-11-01T00:00:00Z", "2024-11-30T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(ledger.beginning_balance.cents(), 75_000);
        assert_eq!(ledger.entries.len(), 2);
        assert_eq!(ledger.entries[0].description, "Jasa");
        assert_eq!(ledger.entries[0].balance.cents(), 125_000);
        assert_eq!(ledger.entries[1].balance.cents(), 105_000);
        assert_eq!(ledger.ending_balance.cents(), 105_000);
        assert_eq!(
            ledger.ending_balance,
            ledger.beginning_balance + ledger.total_credit - ledger.total_debit
        );
    }

    #[tokio::test]
    async fn test_unpaid_report() {
        let db = testing::memory_db().await;
        let owner = testing::user(&db, "siti").await;
        let budi = testing::customer(&db, owner.id, "Pak Budi").await;
        let supplier = testing::customer(&db, owner.id, "Toko Grosir").await;
        let sales = testing::category(&db, owner.id, "Penjualan", CategoryType::Income).await;

        let mut receivable = testing::request(
            TransactionType::Income,
            vec![testing::line(None, "Katering", 1, 300_000)],
        );
        receivable.customer_id = Some(budi.id);
        receivable.category_id = Some(sales.id);
        receivable.payment_status = Some(PaymentStatus::Unpaid);
        receivable.due_date = Some("2024-11-01".to_string());
        db.poster().post(owner.id, &receivable).await.unwrap();

        let mut payable = testing::request(
            TransactionType::Expense,
            vec![testing::line(None, "Beras", 2, 60_000)],
        );
        payable.customer_id = Some(supplier.id);
        payable.payment_status = Some(PaymentStatus::Unpaid);
        let payable = db.poster().post(owner.id, &payable).await.unwrap();

        // Paid ones are ignored
        db.poster()
            .post(owner.id, &testing::request(TransactionType::Income, vec![testing::line(None, "Jasa", 1, 1)]))
            .await
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 11, 8).unwrap();
        let report = db.reports().unpaid(owner.id, today).await.unwrap();

        assert_eq!(report.receivables.len(), 1);
        assert_eq!(report.total_receivable.cents(), 300_000);
        assert_eq!(report.receivables[0].customer_name, "Pak Budi");
        assert!(report.receivables[0].is_overdue);

        assert_eq!(report.payables.len(), 1);
        assert_eq!(report.payables[0].transaction_id, payable.id);
        assert_eq!(report.total_payable.cents(), 120_000);
        assert!(!report.payables[0].is_overdue);

        db.transactions().mark_paid(owner.id, payable.id).await.unwrap();
        let report = db.reports().unpaid(owner.id, today).await.unwrap();
        assert!(report.payables.is_empty());
    }
}
