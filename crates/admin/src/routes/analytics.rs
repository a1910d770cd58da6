//! Analytics, sales reports and the customer list.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use modern_shop_core::analytics::{
    CustomerSummary, SalesReportRow, SalesSummary, customers, sales_report, summarize,
};
use modern_shop_core::catalog::ProductQuery;
use modern_shop_core::export::sales_report_sheet;
use modern_shop_core::order::Order;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Build the analytics router (mounted under `/admin/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(analytics))
        .route("/reports/sales", get(sales))
        .route("/reports/sales.csv", get(sales_csv))
        .route("/customers", get(customer_list))
}

/// Optional inclusive date range for reports.
#[derive(Debug, Default, Deserialize)]
pub struct ReportRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportRange {
    fn select(&self, orders: Vec<Order>) -> Result<Vec<Order>> {
        let from = self.from.unwrap_or(NaiveDate::MIN);
        let to = self.to.unwrap_or(NaiveDate::MAX);
        if from > to {
            return Err(AppError::BadRequest(format!(
                "`from` ({from}) is after `to` ({to})"
            )));
        }
        Ok(modern_shop_core::order::orders_between(orders, from, to))
    }
}

/// Analytics page data.
#[derive(Debug, Serialize)]
pub struct AnalyticsView {
    pub summary: SalesSummary,
    pub sales_report: Vec<SalesReportRow>,
}

/// GET /admin/api/analytics
#[instrument(skip_all)]
async fn analytics(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<AnalyticsView>> {
    let orders = state.orders().all().await?;
    let products = state.catalog().list_products(&ProductQuery::default()).await?;

    Ok(Json(AnalyticsView {
        summary: summarize(&orders, &products, Utc::now()),
        sales_report: sales_report(&orders),
    }))
}

/// GET /admin/api/reports/sales?from&to
async fn sales(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(range): Query<ReportRange>,
) -> Result<Json<Vec<SalesReportRow>>> {
    let orders = range.select(state.orders().all().await?)?;
    Ok(Json(sales_report(&orders)))
}

/// GET /admin/api/reports/sales.csv?from&to
#[instrument(skip(state, _admin))]
async fn sales_csv(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(range): Query<ReportRange>,
) -> Result<impl IntoResponse> {
    let orders = range.select(state.orders().all().await?)?;
    let sheet = sales_report_sheet(&sales_report(&orders));
    let disposition = format!("attachment; filename=\"{}.csv\"", sheet.name);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        sheet.to_csv(),
    ))
}

/// GET /admin/api/customers
async fn customer_list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<CustomerSummary>>> {
    let orders = state.orders().all().await?;
    Ok(Json(customers(&orders)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_rejected() {
        let range = ReportRange {
            from: NaiveDate::from_ymd_opt(2024, 3, 2),
            to: NaiveDate::from_ymd_opt(2024, 3, 1),
        };
        assert!(matches!(
            range.select(Vec::new()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_open_range_keeps_everything() {
        assert!(ReportRange::default().select(Vec::new()).unwrap().is_empty());
    }
}
