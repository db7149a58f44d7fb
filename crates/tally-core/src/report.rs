//! # Dashboard Reports
//!
//! Assembly of the dashboard figures from rows the store hands back.
//! The store does the filtering and summing it is good at; bucketing into
//! local calendar days happens here, where the time zone is known.
//!
//! ```text
//! stats:        revenue ─ cogs = gross ─ expense = net
//! chart:        one point per local day in [from, to], zeros included
//! performance:  INCOME lines grouped by product id (or name), by revenue desc
//! low stock:    stock <= min_stock
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::range::DateRange;
use crate::types::{Product, TransactionType};

/// Day label on the chart axis, e.g. `08 Nov`.
pub const CHART_LABEL_FORMAT: &str = "%d %b";

// =============================================================================
// Stats
// =============================================================================

/// Headline figures for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_revenue: Money,
    pub total_cogs: Money,
    pub gross_profit: Money,
    /// Operating expense: every EXPENSE total in range.
    pub total_expense: Money,
    pub net_profit: Money,
    /// INCOME + EXPENSE only; CAPITAL is not trading activity.
    pub transaction_count: i64,
}

impl DashboardStats {
    pub fn new(revenue: Money, cogs: Money, expense: Money, transaction_count: i64) -> Self {
        let gross_profit = revenue - cogs;
        DashboardStats {
            total_revenue: revenue,
            total_cogs: cogs,
            gross_profit,
            total_expense: expense,
            net_profit: gross_profit - expense,
            transaction_count,
        }
    }
}

// =============================================================================
// Chart
// =============================================================================

/// One INCOME or EXPENSE transaction as seen by the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSample {
    pub created_at: DateTime<Utc>,
    pub transaction_type: TransactionType,
    pub amount: Money,
    /// COGS of the transaction's items; zero for EXPENSE.
    pub cogs: Money,
}

/// Parallel daily series, one entry per local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub revenue_data: Vec<Money>,
    pub gross_profit_data: Vec<Money>,
    pub expense_data: Vec<Money>,
}

impl ChartData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Default, Clone, Copy)]
struct DayTotals {
    revenue: Money,
    cogs: Money,
    expense: Money,
}

/// Buckets samples into local days and fills every gap with zeros.
///
/// The result always has exactly `range.days().len()` points.
pub fn build_chart(range: &DateRange, samples: &[ChartSample]) -> ChartData {
    let mut by_day: HashMap<NaiveDate, DayTotals> = HashMap::new();
    for sample in samples {
        let day = by_day.entry(range.local_date(sample.created_at)).or_default();
        match sample.transaction_type {
            TransactionType::Income => {
                day.revenue += sample.amount;
                day.cogs += sample.cogs;
            }
            TransactionType::Expense => day.expense += sample.amount,
            TransactionType::Capital => {}
        }
    }

    let days = range.days();
    let mut chart = ChartData {
        labels: Vec::with_capacity(days.len()),
        revenue_data: Vec::with_capacity(days.len()),
        gross_profit_data: Vec::with_capacity(days.len()),
        expense_data: Vec::with_capacity(days.len()),
    };
    for date in days {
        let totals = by_day.get(&date).copied().unwrap_or_default();
        chart.labels.push(date.format(CHART_LABEL_FORMAT).to_string());
        chart.revenue_data.push(totals.revenue);
        chart.gross_profit_data.push(totals.revenue - totals.cogs);
        chart.expense_data.push(totals.expense);
    }
    chart
}

// =============================================================================
// Product Performance
// =============================================================================

/// One INCOME line in range, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoldLine {
    pub product_id: Option<i64>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPerformance {
    pub product_id: Option<i64>,
    pub product_name: String,
    pub total_sold: i64,
    pub total_revenue: Money,
}

#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
enum ProductKey {
    Id(i64),
    Name(String),
}

/// Groups sold lines by product, falling back to the name for ad-hoc lines,
/// and sorts by revenue descending.
///
/// A product's displayed name is the first one seen, i.e. the most recent
/// snapshot when lines arrive newest first.
pub fn product_performance(lines: &[SoldLine]) -> Vec<ProductPerformance> {
    let mut groups: BTreeMap<ProductKey, ProductPerformance> = BTreeMap::new();
    for line in lines {
        let key = match line.product_id {
            Some(id) => ProductKey::Id(id),
            None => ProductKey::Name(line.product_name.clone()),
        };
        let entry = groups.entry(key).or_insert_with(|| ProductPerformance {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            total_sold: 0,
            total_revenue: Money::zero(),
        });
        entry.total_sold += line.quantity;
        entry.total_revenue += line.unit_price.multiply_quantity(line.quantity);
    }

    let mut result: Vec<ProductPerformance> = groups.into_values().collect();
    result.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    result
}

// =============================================================================
// Low Stock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub product_id: i64,
    pub product_name: String,
    pub sku: String,
    pub stock: i64,
    pub min_stock: i64,
}

/// Products at or below their threshold, emptiest first.
pub fn low_stock(products: &[Product]) -> Vec<LowStockItem> {
    let mut items: Vec<LowStockItem> = products
        .iter()
        .filter(|p| p.is_low_stock())
        .map(|p| LowStockItem {
            product_id: p.id,
            product_name: p.name.clone(),
            sku: p.sku.clone(),
            stock: p.stock,
            min_stock: p.min_stock,
        })
        .collect();
    items.sort_by(|a, b| a.stock.cmp(&b.stock).then(a.product_id.cmp(&b.product_id)));
    items
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Jakarta;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sample(ts: &str, t: TransactionType, amount: i64, cogs: i64) -> ChartSample {
        ChartSample {
            created_at: utc(ts),
            transaction_type: t,
            amount: Money::from_cents(amount),
            cogs: Money::from_cents(cogs),
        }
    }

    #[test]
    fn test_stats_arithmetic() {
        let stats = DashboardStats::new(
            Money::from_major(500),
            Money::from_major(300),
            Money::from_major(50),
            2,
        );
        assert_eq!(stats.gross_profit, Money::from_major(200));
        assert_eq!(stats.net_profit, Money::from_major(150));
    }

    #[test]
    fn test_chart_fills_gaps() {
        let range = DateRange {
            from: utc("2024-11-01T00:00:00Z"),
            to: utc("2024-11-10T12:00:00Z"),
            tz: chrono_tz::UTC,
        };
        let samples = vec![
            sample("2024-11-03T09:00:00Z", TransactionType::Income, 50_000, 30_000),
            sample("2024-11-03T15:00:00Z", TransactionType::Expense, 20_000, 0),
            sample("2024-11-08T09:00:00Z", TransactionType::Income, 10_000, 0),
        ];
        let chart = build_chart(&range, &samples);

        assert_eq!(chart.len(), 10);
        assert_eq!(chart.revenue_data.len(), 10);
        assert_eq!(chart.labels[0], "01 Nov");
        assert_eq!(chart.labels[7], "08 Nov");
        assert_eq!(chart.revenue_data[2].cents(), 50_000);
        assert_eq!(chart.gross_profit_data[2].cents(), 20_000);
        assert_eq!(chart.expense_data[2].cents(), 20_000);
        assert!(chart.revenue_data[1].is_zero());
        assert_eq!(chart.revenue_data[7].cents(), 10_000);
    }

    #[test]
    fn test_chart_days_follow_time_zone() {
        let range = DateRange {
            from: utc("2024-11-01T17:00:00Z"),
            to: utc("2024-11-03T16:59:59Z"),
            tz: Jakarta,
        };
        // 23:30 UTC on 2 Nov is 06:30 on 3 Nov in Jakarta
        let samples = vec![sample("2024-11-02T23:30:00Z", TransactionType::Income, 100, 0)];
        let chart = build_chart(&range, &samples);
        assert_eq!(chart.labels, vec!["02 Nov", "03 Nov"]);
        assert!(chart.revenue_data[0].is_zero());
        assert_eq!(chart.revenue_data[1].cents(), 100);
    }

    #[test]
    fn test_product_performance_groups_and_sorts() {
        let line = |id: Option<i64>, name: &str, qty: i64, price: i64| SoldLine {
            product_id: id,
            product_name: name.to_string(),
            quantity: qty,
            unit_price: Money::from_cents(price),
        };
        let lines = vec![
            line(Some(1), "Kopi Susu", 2, 1500),
            line(None, "Ongkir", 1, 10_000),
            line(Some(1), "Kopi", 3, 1500),
            line(Some(2), "Teh", 1, 500),
            line(None, "Ongkir", 1, 5_000),
        ];
        let perf = product_performance(&lines);

        assert_eq!(perf.len(), 3);
        assert_eq!(perf[0].product_name, "Ongkir");
        assert_eq!(perf[0].total_revenue.cents(), 15_000);
        assert_eq!(perf[1].product_id, Some(1));
        assert_eq!(perf[1].product_name, "Kopi Susu");
        assert_eq!(perf[1].total_sold, 5);
        assert_eq!(perf[1].total_revenue.cents(), 7_500);
        assert_eq!(perf[2].product_id, Some(2));
    }
}
