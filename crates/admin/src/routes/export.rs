//! Spreadsheet download of orders.

use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use modern_shop_core::export::orders_workbook;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/export/orders", get(export_orders))
}

/// Which sheet of the workbook to download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    #[default]
    Orders,
    Items,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub sheet: SheetKind,
}

/// GET /admin/api/export/orders?from&to&sheet=orders|items
#[instrument(skip(state, admin), fields(admin = %admin.email))]
async fn export_orders(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    if query.from > query.to {
        return Err(AppError::BadRequest(format!(
            "`from` ({}) is after `to` ({})",
            query.from, query.to
        )));
    }

    let orders = state.orders().all().await?;
    let workbook = orders_workbook(orders, query.from, query.to);
    let sheet = match query.sheet {
        SheetKind::Orders => workbook.orders,
        SheetKind::Items => workbook.items,
    };
    tracing::info!(rows = sheet.rows.len(), sheet = sheet.name, "Orders exported");

    let disposition = format!(
        "attachment; filename=\"{}\"",
        sheet.file_name(query.from, query.to)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        sheet.to_csv(),
    ))
}
