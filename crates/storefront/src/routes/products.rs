//! Product and category route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use modern_shop_core::ProductId;
use modern_shop_core::catalog::{CatalogError, Category, Product, ProductQuery};
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// List products, optionally filtered.
///
/// Query parameters: `search`, `category`, `min_price`, `max_price`, `in_stock`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    let products = state
        .catalog()
        .read(|c| c.search(&query).into_iter().cloned().collect())
        .await;
    Json(products)
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = ProductId::new(id);
    let product = state
        .catalog()
        .get(&id)
        .await
        .ok_or(CatalogError::ProductNotFound(id))?;
    Ok(Json(product))
}

/// List categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.catalog().read(|c| c.categories().to_vec()).await)
}
