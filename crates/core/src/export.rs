//! Spreadsheet export of orders.
//!
//! Produces two sheets (orders and their line items) rendered as RFC 4180
//! CSV. Dates use `yyyy-MM-dd HH:mm` (UTC) and amounts use `$0.00`.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};

use crate::analytics::SalesReportRow;
use crate::order::{Order, orders_between};

/// Date format used in every exported sheet.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

const ORDER_HEADERS: [&str; 12] = [
    "Order ID",
    "Customer Name",
    "Email",
    "Phone",
    "Shipping Address",
    "Subtotal",
    "Tax",
    "Total",
    "Status",
    "Payment Method",
    "Created At",
    "Notes",
];

const ITEM_HEADERS: [&str; 6] = [
    "Order ID",
    "Product ID",
    "Product Name",
    "Quantity",
    "Price",
    "Subtotal",
];

/// A named table of string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Render as CSV with CRLF line endings.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_row(&mut out, self.headers.iter().copied());
        for row in &self.rows {
            write_row(&mut out, row.iter().map(String::as_str));
        }
        out
    }

    /// Suggested file name for a download, e.g. `orders_2024-03-01_2024-03-31.csv`.
    #[must_use]
    pub fn file_name(&self, from: NaiveDate, to: NaiveDate) -> String {
        format!("{}_{from}_{to}.csv", self.name)
    }
}

/// The orders sheet and the items sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWorkbook {
    pub orders: Sheet,
    pub items: Sheet,
}

/// Build the workbook for orders created between `from` and `to` (inclusive).
#[must_use]
pub fn orders_workbook(orders: Vec<Order>, from: NaiveDate, to: NaiveDate) -> OrderWorkbook {
    let mut selected = orders_between(orders, from, to);
    selected.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let order_rows = selected
        .iter()
        .map(|o| {
            vec![
                o.id.to_string(),
                o.customer.name.clone(),
                o.customer.email.to_string(),
                o.customer.phone.clone(),
                o.customer.address.clone(),
                o.subtotal.to_string(),
                o.tax.to_string(),
                o.total.to_string(),
                o.status.to_string(),
                o.payment_method.to_string(),
                format_date(o.created_at),
                o.notes.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let item_rows = selected
        .iter()
        .flat_map(|o| {
            o.items.iter().map(move |item| {
                vec![
                    o.id.to_string(),
                    item.product_id.to_string(),
                    item.name.clone(),
                    item.quantity.to_string(),
                    item.unit_price.to_string(),
                    item.line_total().to_string(),
                ]
            })
        })
        .collect();

    OrderWorkbook {
        orders: Sheet {
            name: "orders",
            headers: ORDER_HEADERS.to_vec(),
            rows: order_rows,
        },
        items: Sheet {
            name: "order_items",
            headers: ITEM_HEADERS.to_vec(),
            rows: item_rows,
        },
    }
}

/// Sales report as a sheet (`Date,Sales,Orders`).
#[must_use]
pub fn sales_report_sheet(rows: &[SalesReportRow]) -> Sheet {
    Sheet {
        name: "sales_report",
        headers: vec!["Date", "Sales", "Orders"],
        rows: rows
            .iter()
            .map(|r| vec![r.date.to_string(), r.sales.to_string(), r.orders.to_string()])
            .collect(),
    }
}

/// Format a timestamp the way exported sheets show it.
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

fn write_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_cell(out, cell);
    }
    out.push_str("\r\n");
}

fn write_cell(out: &mut String, cell: &str) {
    if cell.contains([',', '"', '\n', '\r']) {
        let _ = write!(out, "\"{}\"", cell.replace('"', "\"\""));
    } else {
        out.push_str(cell);
    }
}
