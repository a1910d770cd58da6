//! Sales figures derived from orders and products.
//!
//! Only delivered orders count as revenue. Everything here is a pure
//! function of its inputs plus an explicit `now`.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::catalog::Product;
use crate::order::Order;
use crate::types::{Email, OrderStatus, Price, ProductId};

/// Products below this stock level are reported as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// Revenue for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Price,
}

/// Revenue for one month of the current year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    pub month: u32,
    pub revenue: Price,
}

/// Current month against the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthComparison {
    pub current_revenue: Price,
    pub previous_revenue: Price,
    pub revenue_change_pct: Decimal,
    pub current_orders: u64,
    pub previous_orders: u64,
    pub orders_change_pct: Decimal,
}

/// Product running low.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockItem {
    pub id: ProductId,
    pub name: String,
    pub stock: u32,
}

/// Dashboard summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub total_revenue: Price,
    pub completed_orders: u64,
    pub pending_orders: u64,
    pub items_sold: u64,
    pub product_count: usize,
    pub month: MonthComparison,
    pub low_stock: Vec<LowStockItem>,
    pub last_7_days: Vec<DailyRevenue>,
    pub monthly: Vec<MonthlyRevenue>,
}

/// One row of the sales report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesReportRow {
    pub date: NaiveDate,
    pub sales: Price,
    pub orders: u64,
}

/// A customer aggregated from their orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub order_count: u64,
    pub total_spent: Price,
    pub last_order_at: DateTime<Utc>,
}

/// Compute the dashboard summary.
#[must_use]
pub fn summarize(orders: &[Order], products: &[Product], now: DateTime<Utc>) -> SalesSummary {
    let completed: Vec<&Order> = orders.iter().filter(|o| o.status.is_completed()).collect();

    SalesSummary {
        total_revenue: completed.iter().map(|o| o.total).sum(),
        completed_orders: completed.len() as u64,
        pending_orders: orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count() as u64,
        items_sold: completed.iter().map(|o| o.item_count()).sum(),
        product_count: products.len(),
        month: month_comparison(&completed, now),
        low_stock: low_stock(products),
        last_7_days: daily_revenue(&completed, now.date_naive(), 7),
        monthly: monthly_revenue(&completed, now.year()),
    }
}

/// Products with stock below [`LOW_STOCK_THRESHOLD`], lowest first.
#[must_use]
pub fn low_stock(products: &[Product]) -> Vec<LowStockItem> {
    let mut items: Vec<LowStockItem> = products
        .iter()
        .filter(|p| p.stock < LOW_STOCK_THRESHOLD)
        .map(|p| LowStockItem {
            id: p.id.clone(),
            name: p.name.clone(),
            stock: p.stock,
        })
        .collect();
    items.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
    items
}

/// Revenue per day for the `days` days ending at `today`, zero-filled.
fn daily_revenue(completed: &[&Order], today: NaiveDate, days: u64) -> Vec<DailyRevenue> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| DailyRevenue {
            date,
            revenue: completed
                .iter()
                .filter(|o| o.created_on() == date)
                .map(|o| o.total)
                .sum(),
        })
        .collect()
}

fn monthly_revenue(completed: &[&Order], year: i32) -> Vec<MonthlyRevenue> {
    (1..=12)
        .map(|month| MonthlyRevenue {
            month,
            revenue: completed
                .iter()
                .filter(|o| o.created_at.year() == year && o.created_at.month() == month)
                .map(|o| o.total)
                .sum(),
        })
        .collect()
}

fn month_comparison(completed: &[&Order], now: DateTime<Utc>) -> MonthComparison {
    let current = (now.year(), now.month());
    let previous = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    let in_month = |(year, month): (i32, u32)| {
        completed
            .iter()
            .filter(move |o| o.created_at.year() == year && o.created_at.month() == month)
    };

    let current_revenue: Price = in_month(current).map(|o| o.total).sum();
    let previous_revenue: Price = in_month(previous).map(|o| o.total).sum();
    let current_orders = in_month(current).count() as u64;
    let previous_orders = in_month(previous).count() as u64;

    MonthComparison {
        current_revenue,
        previous_revenue,
        revenue_change_pct: percent_change(previous_revenue.amount(), current_revenue.amount()),
        current_orders,
        previous_orders,
        orders_change_pct: percent_change(
            Decimal::from(previous_orders),
            Decimal::from(current_orders),
        ),
    }
}

/// Percentage change from `previous` to `current`, one decimal place.
///
/// A rise from zero reports 100%; zero to zero reports 0%.
#[must_use]
pub fn percent_change(previous: Decimal, current: Decimal) -> Decimal {
    if previous.is_zero() {
        return if current.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::ONE_HUNDRED
        };
    }
    ((current - previous) / previous * Decimal::ONE_HUNDRED).round_dp(1)
}

/// Orders grouped by creation date, oldest first.
#[must_use]
pub fn sales_report(orders: &[Order]) -> Vec<SalesReportRow> {
    let mut by_day: BTreeMap<NaiveDate, (Price, u64)> = BTreeMap::new();
    for order in orders {
        let entry = by_day.entry(order.created_on()).or_insert((Price::ZERO, 0));
        entry.0 = entry.0 + order.total;
        entry.1 += 1;
    }
    by_day
        .into_iter()
        .map(|(date, (sales, orders))| SalesReportRow {
            date,
            sales,
            orders,
        })
        .collect()
}

/// Customers derived from orders, keyed by lower-cased email.
///
/// Contact details come from the most recent order. Sorted by total spent,
/// highest first.
#[must_use]
pub fn customers(orders: &[Order]) -> Vec<CustomerSummary> {
    let mut by_email: HashMap<String, CustomerSummary> = HashMap::new();
    for order in orders {
        let key = order.customer.email.normalized();
        let entry = by_email.entry(key).or_insert_with(|| CustomerSummary {
            name: order.customer.name.clone(),
            email: order.customer.email.clone(),
            phone: order.customer.phone.clone(),
            order_count: 0,
            total_spent: Price::ZERO,
            last_order_at: order.created_at,
        });
        entry.order_count += 1;
        entry.total_spent = entry.total_spent + order.total;
        if order.created_at >= entry.last_order_at {
            entry.last_order_at = order.created_at;
            entry.name.clone_from(&order.customer.name);
            entry.phone.clone_from(&order.customer.phone);
        }
    }
    let mut customers: Vec<CustomerSummary> = by_email.into_values().collect();
    customers.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| a.email.as_str().cmp(b.email.as_str()))
    });
    customers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::order::{CustomerInfo, LineItem};
    use crate::types::{OrderId, PaymentMethod};

    fn order(y: i32, m: u32, d: u32, cents: u64, status: OrderStatus, email: &str) -> Order {
        let at = Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap();
        Order {
            id: OrderId::generate(),
            items: vec![LineItem {
                product_id: ProductId::new("p"),
                name: "P".to_string(),
                unit_price: Price::from_cents(cents),
                quantity: 2,
                image_url: None,
            }],
            subtotal: Price::from_cents(cents),
            tax: Price::ZERO,
            total: Price::from_cents(cents),
            status,
            customer: CustomerInfo::parse("Name", email, "555", "Street").unwrap(),
            payment_method: PaymentMethod::Cash,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(
            percent_change(Decimal::ZERO, Decimal::from(5)),
            Decimal::ONE_HUNDRED
        );
        assert_eq!(
            percent_change(Decimal::from(200), Decimal::from(100)),
            Decimal::from(-50)
        );
    }

    #[test]
    fn test_summary_counts_only_delivered() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let orders = vec![
            order(2024, 3, 9, 1000, OrderStatus::Delivered, "a@x.io"),
            order(2024, 3, 10, 500, OrderStatus::Pending, "b@x.io"),
            order(2024, 2, 1, 2000, OrderStatus::Delivered, "a@x.io"),
            order(2024, 3, 1, 700, OrderStatus::Cancelled, "c@x.io"),
        ];
        let summary = summarize(&orders, &[], now);
        assert_eq!(summary.total_revenue, Price::from_cents(3000));
        assert_eq!(summary.completed_orders, 2);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.items_sold, 4);
        assert_eq!(summary.month.current_revenue, Price::from_cents(1000));
        assert_eq!(summary.month.previous_revenue, Price::from_cents(2000));
        assert_eq!(summary.month.revenue_change_pct, Decimal::from(-50));

        assert_eq!(summary.last_7_days.len(), 7);
        assert_eq!(summary.last_7_days.last().unwrap().date, now.date_naive());
        let mar9 = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let day = summary.last_7_days.iter().find(|d| d.date == mar9).unwrap();
        assert_eq!(day.revenue, Price::from_cents(1000));

        assert_eq!(summary.monthly.len(), 12);
        assert_eq!(summary.monthly[1].revenue, Price::from_cents(2000));
    }

    #[test]
    fn test_january_compares_with_previous_december() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let orders = vec![order(2023, 12, 20, 1000, OrderStatus::Delivered, "a@x.io")];
        let summary = summarize(&orders, &[], now);
        assert_eq!(summary.month.previous_orders, 1);
        assert_eq!(summary.month.current_orders, 0);
    }

    #[test]
    fn test_sales_report_groups_by_day() {
        let orders = vec![
            order(2024, 3, 2, 500, OrderStatus::Pending, "a@x.io"),
            order(2024, 3, 1, 1000, OrderStatus::Pending, "a@x.io"),
            order(2024, 3, 2, 250, OrderStatus::Delivered, "b@x.io"),
        ];
        let report = sales_report(&orders);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(report[1].sales, Price::from_cents(750));
        assert_eq!(report[1].orders, 2);
    }

    #[test]
    fn test_customers_grouped_by_email() {
        let orders = vec![
            order(2024, 3, 1, 1000, OrderStatus::Pending, "Ana@X.io"),
            order(2024, 3, 5, 500, OrderStatus::Delivered, "ana@x.io"),
            order(2024, 3, 2, 3000, OrderStatus::Pending, "bo@x.io"),
        ];
        let customers = customers(&orders);
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].email.as_str(), "bo@x.io");
        assert_eq!(customers[1].order_count, 2);
        assert_eq!(customers[1].total_spent, Price::from_cents(1500));
        assert_eq!(
            customers[1].last_order_at,
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
        );
    }
}
