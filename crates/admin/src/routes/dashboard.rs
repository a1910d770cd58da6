//! Dashboard summary.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use modern_shop_core::analytics::{SalesSummary, summarize};
use modern_shop_core::catalog::ProductQuery;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin", get(index))
}

/// GET /admin
#[instrument(skip_all)]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<SalesSummary>> {
    let orders = state.orders().all().await?;
    let products = state.catalog().list_products(&ProductQuery::default()).await?;
    Ok(Json(summarize(&orders, &products, Utc::now())))
}
